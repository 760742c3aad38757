// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Monthly report, row, refund and exchange-rate log queries.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_domain::DataMonth;
use tracing::debug;

use crate::data_models::{ExchangeRateLogData, RefundData, ReportData, ReportRowData};
use crate::diesel_schema::{csv_data_rows, exchange_rate_logs, invoices, monthly_reports, refunds};
use crate::error::PersistenceError;
use crate::queries::parse_decimal;

#[derive(Queryable, Selectable)]
#[diesel(table_name = monthly_reports)]
pub(crate) struct ReportRow {
    report_id: i64,
    data_month: String,
    exchange_rate: String,
    revenue_task: Option<String>,
    source_filename: Option<String>,
    row_count: i32,
    created_by: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ReportRow> for ReportData {
    type Error = PersistenceError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            report_id: row.report_id,
            data_month: row.data_month.parse()?,
            exchange_rate: row.exchange_rate.parse()?,
            revenue_task: row.revenue_task,
            source_filename: row.source_filename,
            row_count: row.row_count,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = csv_data_rows)]
pub(crate) struct DataRow {
    row_id: i64,
    report_id: i64,
    agency_id: Option<i64>,
    liver_id: Option<i64>,
    creator_id: Option<String>,
    creator_handle: Option<String>,
    creator_name: Option<String>,
    diamonds: i64,
    reward_usd: String,
    reward_jpy: i64,
    commission_rate: String,
    commission_jpy: i64,
}

impl TryFrom<DataRow> for ReportRowData {
    type Error = PersistenceError;

    fn try_from(row: DataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            row_id: row.row_id,
            report_id: row.report_id,
            agency_id: row.agency_id,
            liver_id: row.liver_id,
            creator_id: row.creator_id,
            creator_handle: row.creator_handle,
            creator_name: row.creator_name,
            diamonds: row.diamonds,
            reward_usd: parse_decimal("reward_usd", &row.reward_usd)?,
            reward_jpy: row.reward_jpy,
            commission_rate: row.commission_rate.parse()?,
            commission_jpy: row.commission_jpy,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = refunds)]
pub(crate) struct RefundRow {
    refund_id: i64,
    report_id: i64,
    liver_id: Option<i64>,
    agency_id: Option<i64>,
    amount_usd: String,
    amount_jpy: i64,
    reason: Option<String>,
    created_by: i64,
    created_at: String,
}

impl TryFrom<RefundRow> for RefundData {
    type Error = PersistenceError;

    fn try_from(row: RefundRow) -> Result<Self, Self::Error> {
        Ok(Self {
            refund_id: row.refund_id,
            report_id: row.report_id,
            liver_id: row.liver_id,
            agency_id: row.agency_id,
            amount_usd: parse_decimal("amount_usd", &row.amount_usd)?,
            amount_jpy: row.amount_jpy,
            reason: row.reason,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = exchange_rate_logs)]
struct ExchangeRateLogRow {
    log_id: i64,
    report_id: i64,
    old_rate: String,
    new_rate: String,
    rows_recalculated: i32,
    refunds_recalculated: i32,
    changed_by: i64,
    changed_at: String,
}

impl TryFrom<ExchangeRateLogRow> for ExchangeRateLogData {
    type Error = PersistenceError;

    fn try_from(row: ExchangeRateLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            log_id: row.log_id,
            report_id: row.report_id,
            old_rate: row.old_rate.parse()?,
            new_rate: row.new_rate.parse()?,
            rows_recalculated: row.rows_recalculated,
            refunds_recalculated: row.refunds_recalculated,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        })
    }
}

backend_fn! {
/// Retrieves a report by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_report(conn: &mut _, report_id: i64) -> Result<Option<ReportData>, PersistenceError> {
    let row: Option<ReportRow> = monthly_reports::table
        .filter(monthly_reports::report_id.eq(report_id))
        .select(ReportRow::as_select())
        .first(conn)
        .optional()?;

    row.map(ReportData::try_from).transpose()
}
}

backend_fn! {
/// Retrieves the report covering `data_month`, if one exists.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn find_report_by_month(
    conn: &mut _,
    data_month: DataMonth,
) -> Result<Option<ReportData>, PersistenceError> {
    debug!(data_month = %data_month, "Looking up report by month");

    let row: Option<ReportRow> = monthly_reports::table
        .filter(monthly_reports::data_month.eq(data_month.to_string()))
        .select(ReportRow::as_select())
        .first(conn)
        .optional()?;

    row.map(ReportData::try_from).transpose()
}
}

backend_fn! {
/// Lists reports, most recent month first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_reports(conn: &mut _) -> Result<Vec<ReportData>, PersistenceError> {
    let rows: Vec<ReportRow> = monthly_reports::table
        .order(monthly_reports::data_month.desc())
        .select(ReportRow::as_select())
        .load(conn)?;

    rows.into_iter().map(ReportData::try_from).collect()
}
}

backend_fn! {
/// Lists a report's rows, optionally restricted to some agencies.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_report_rows(
    conn: &mut _,
    report_id: i64,
    agency_ids: Option<&[i64]>,
) -> Result<Vec<ReportRowData>, PersistenceError> {
    let mut query = csv_data_rows::table
        .filter(csv_data_rows::report_id.eq(report_id))
        .into_boxed();

    if let Some(ids) = agency_ids {
        query = query.filter(csv_data_rows::agency_id.eq_any(ids.to_vec()));
    }

    let rows: Vec<DataRow> = query
        .order(csv_data_rows::row_id.asc())
        .select(DataRow::as_select())
        .load(conn)?;

    rows.into_iter().map(ReportRowData::try_from).collect()
}
}

backend_fn! {
/// Retrieves a refund by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_refund(conn: &mut _, refund_id: i64) -> Result<Option<RefundData>, PersistenceError> {
    let row: Option<RefundRow> = refunds::table
        .filter(refunds::refund_id.eq(refund_id))
        .select(RefundRow::as_select())
        .first(conn)
        .optional()?;

    row.map(RefundData::try_from).transpose()
}
}

backend_fn! {
/// Lists the refunds recorded against a report.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_refunds(conn: &mut _, report_id: i64) -> Result<Vec<RefundData>, PersistenceError> {
    let rows: Vec<RefundRow> = refunds::table
        .filter(refunds::report_id.eq(report_id))
        .order(refunds::refund_id.asc())
        .select(RefundRow::as_select())
        .load(conn)?;

    rows.into_iter().map(RefundData::try_from).collect()
}
}

backend_fn! {
/// Lists exchange-rate changes for a report, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_exchange_rate_logs(
    conn: &mut _,
    report_id: i64,
) -> Result<Vec<ExchangeRateLogData>, PersistenceError> {
    let rows: Vec<ExchangeRateLogRow> = exchange_rate_logs::table
        .filter(exchange_rate_logs::report_id.eq(report_id))
        .order(exchange_rate_logs::log_id.asc())
        .select(ExchangeRateLogRow::as_select())
        .load(conn)?;

    rows.into_iter().map(ExchangeRateLogData::try_from).collect()
}
}

backend_fn! {
/// Counts invoices issued against a report.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_invoices_for_report(conn: &mut _, report_id: i64) -> Result<i64, PersistenceError> {
    let count: i64 = invoices::table
        .filter(invoices::report_id.eq(report_id))
        .count()
        .get_result(conn)?;
    Ok(count)
}
}
