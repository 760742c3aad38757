// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Monthly report mutations: import, replacement, exchange-rate
//! recalculation and refunds.
//!
//! The multi-step operations here are written as single bodies so that the
//! adapter can run each of them inside one transaction.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_domain::{DomainError, ExchangeRate, RewardLine, usd_to_jpy};
use tracing::{debug, info, warn};

use crate::backend::PersistenceBackend;
use crate::data_models::{
    ImportOutcome, NewRefund, NewReport, NewReportRow, RecalculationSummary, RefundData,
    ReportData, ReportRowData,
};
use crate::diesel_schema::{csv_data_rows, exchange_rate_logs, invoices, monthly_reports, refunds};
use crate::error::PersistenceError;
use crate::queries::reports::{DataRow, RefundRow, ReportRow};
use crate::timestamp::now_timestamp;

fn calculation_error(err: &DomainError) -> PersistenceError {
    PersistenceError::Other(format!("Calculation failed: {err}"))
}

fn to_count(value: usize, what: &str) -> Result<i32, PersistenceError> {
    i32::try_from(value).map_err(|_| PersistenceError::Other(format!("Too many {what}")))
}

backend_fn! {
/// Stores a report and its rows, optionally replacing the report that
/// already covers the same month.
///
/// Without `replace`, an existing report for the month is refused with
/// `DuplicateDataMonth`. With `replace`, the named report must be the one
/// covering the month and must have no invoices; its refunds are carried
/// over to the new report with JPY recomputed at the new rate, then it is
/// deleted along with its rows and rate history.
///
/// # Errors
///
/// Returns `DuplicateDataMonth`, `ReportHasInvoices` or `NotFound` as above,
/// or an error if any write fails.
pub fn import_report(
    conn: &mut _,
    new: &NewReport,
    rows: &[NewReportRow],
    replace: Option<i64>,
) -> Result<ImportOutcome, PersistenceError> {
    let month: String = new.data_month.to_string();
    info!(data_month = %month, rows = rows.len(), replace = ?replace, "Importing report");

    let existing: Option<ReportRow> = monthly_reports::table
        .filter(monthly_reports::data_month.eq(&month))
        .select(ReportRow::as_select())
        .first(conn)
        .optional()?;
    let existing: Option<ReportData> = existing.map(ReportData::try_from).transpose()?;

    let mut carried_refunds: Vec<RefundData> = Vec::new();
    let mut replaced_report_id: Option<i64> = None;

    match (existing, replace) {
        (None, None) => {}
        (Some(report), None) => {
            warn!(data_month = %month, report_id = report.report_id, "Month already imported");
            return Err(PersistenceError::DuplicateDataMonth {
                data_month: month,
                report_id: report.report_id,
            });
        }
        (existing, Some(old_id)) => {
            let Some(report) = existing.filter(|r| r.report_id == old_id) else {
                return Err(PersistenceError::NotFound(format!(
                    "Report {old_id} does not cover {month}"
                )));
            };

            let invoice_count: i64 = invoices::table
                .filter(invoices::report_id.eq(report.report_id))
                .count()
                .get_result(conn)?;
            if invoice_count > 0 {
                return Err(PersistenceError::ReportHasInvoices {
                    report_id: report.report_id,
                    invoice_count,
                });
            }

            let old_refunds: Vec<RefundRow> = refunds::table
                .filter(refunds::report_id.eq(report.report_id))
                .order(refunds::refund_id.asc())
                .select(RefundRow::as_select())
                .load(conn)?;
            carried_refunds = old_refunds
                .into_iter()
                .map(RefundData::try_from)
                .collect::<Result<_, _>>()?;

            diesel::delete(refunds::table)
                .filter(refunds::report_id.eq(report.report_id))
                .execute(conn)?;
            // Rows and rate logs cascade.
            diesel::delete(monthly_reports::table)
                .filter(monthly_reports::report_id.eq(report.report_id))
                .execute(conn)?;

            replaced_report_id = Some(report.report_id);
        }
    }

    let now: String = now_timestamp()?;
    diesel::insert_into(monthly_reports::table)
        .values((
            monthly_reports::data_month.eq(&month),
            monthly_reports::exchange_rate.eq(new.exchange_rate.to_string()),
            monthly_reports::revenue_task.eq(new.revenue_task.as_deref()),
            monthly_reports::source_filename.eq(new.source_filename.as_deref()),
            monthly_reports::row_count.eq(to_count(rows.len(), "rows")?),
            monthly_reports::created_by.eq(new.created_by),
            monthly_reports::created_at.eq(&now),
            monthly_reports::updated_at.eq(&now),
        ))
        .execute(conn)?;
    let report_id: i64 = conn.get_last_insert_rowid()?;

    for row in rows {
        let raw_json: String = serde_json::to_string(&row.raw)?;
        diesel::insert_into(csv_data_rows::table)
            .values((
                csv_data_rows::report_id.eq(report_id),
                csv_data_rows::agency_id.eq(row.agency_id),
                csv_data_rows::liver_id.eq(row.liver_id),
                csv_data_rows::creator_id.eq(row.creator_id.as_deref()),
                csv_data_rows::creator_handle.eq(row.creator_handle.as_deref()),
                csv_data_rows::creator_name.eq(row.creator_name.as_deref()),
                csv_data_rows::diamonds.eq(row.diamonds),
                csv_data_rows::reward_usd.eq(row.reward_usd.to_string()),
                csv_data_rows::reward_jpy.eq(row.reward_jpy),
                csv_data_rows::commission_rate.eq(row.commission_rate.to_string()),
                csv_data_rows::commission_jpy.eq(row.commission_jpy),
                csv_data_rows::raw_json.eq(&raw_json),
            ))
            .execute(conn)?;
    }

    for refund in &carried_refunds {
        let amount_jpy: i64 =
            usd_to_jpy(refund.amount_usd, new.exchange_rate).map_err(|e| calculation_error(&e))?;
        diesel::insert_into(refunds::table)
            .values((
                refunds::report_id.eq(report_id),
                refunds::liver_id.eq(refund.liver_id),
                refunds::agency_id.eq(refund.agency_id),
                refunds::amount_usd.eq(refund.amount_usd.to_string()),
                refunds::amount_jpy.eq(amount_jpy),
                refunds::reason.eq(refund.reason.as_deref()),
                refunds::created_by.eq(refund.created_by),
                refunds::created_at.eq(&refund.created_at),
            ))
            .execute(conn)?;
    }

    info!(
        report_id,
        rows_inserted = rows.len(),
        refunds_migrated = carried_refunds.len(),
        "Report imported"
    );

    Ok(ImportOutcome {
        report_id,
        rows_inserted: rows.len(),
        replaced_report_id,
        refunds_migrated: carried_refunds.len(),
    })
}
}

backend_fn! {
/// Changes a report's exchange rate and recomputes every row and refund.
///
/// Row commission uses the commission rate snapshotted on the row. A log
/// entry records the old and new rate.
///
/// # Errors
///
/// Returns `NotFound` if the report does not exist, `ReportHasInvoices` if
/// invoices were issued against it, or an error if any write fails.
pub fn recalculate_report(
    conn: &mut _,
    report_id: i64,
    new_rate: ExchangeRate,
    changed_by: i64,
) -> Result<RecalculationSummary, PersistenceError> {
    let report: Option<ReportRow> = monthly_reports::table
        .filter(monthly_reports::report_id.eq(report_id))
        .select(ReportRow::as_select())
        .first(conn)
        .optional()?;
    let Some(report) = report.map(ReportData::try_from).transpose()? else {
        return Err(PersistenceError::NotFound(format!(
            "Report {report_id} not found"
        )));
    };

    let invoice_count: i64 = invoices::table
        .filter(invoices::report_id.eq(report_id))
        .count()
        .get_result(conn)?;
    if invoice_count > 0 {
        return Err(PersistenceError::ReportHasInvoices {
            report_id,
            invoice_count,
        });
    }

    let rows: Vec<DataRow> = csv_data_rows::table
        .filter(csv_data_rows::report_id.eq(report_id))
        .select(DataRow::as_select())
        .load(conn)?;
    let rows: Vec<ReportRowData> = rows
        .into_iter()
        .map(ReportRowData::try_from)
        .collect::<Result<_, _>>()?;

    for row in &rows {
        let line: RewardLine = RewardLine::compute(row.reward_usd, new_rate, row.commission_rate)
            .map_err(|e| calculation_error(&e))?;
        diesel::update(csv_data_rows::table)
            .filter(csv_data_rows::row_id.eq(row.row_id))
            .set((
                csv_data_rows::reward_jpy.eq(line.reward_jpy),
                csv_data_rows::commission_jpy.eq(line.commission_jpy),
            ))
            .execute(conn)?;
    }

    let report_refunds: Vec<RefundRow> = refunds::table
        .filter(refunds::report_id.eq(report_id))
        .select(RefundRow::as_select())
        .load(conn)?;
    let report_refunds: Vec<RefundData> = report_refunds
        .into_iter()
        .map(RefundData::try_from)
        .collect::<Result<_, _>>()?;

    for refund in &report_refunds {
        let amount_jpy: i64 =
            usd_to_jpy(refund.amount_usd, new_rate).map_err(|e| calculation_error(&e))?;
        diesel::update(refunds::table)
            .filter(refunds::refund_id.eq(refund.refund_id))
            .set(refunds::amount_jpy.eq(amount_jpy))
            .execute(conn)?;
    }

    let now: String = now_timestamp()?;
    diesel::update(monthly_reports::table)
        .filter(monthly_reports::report_id.eq(report_id))
        .set((
            monthly_reports::exchange_rate.eq(new_rate.to_string()),
            monthly_reports::updated_at.eq(&now),
        ))
        .execute(conn)?;

    diesel::insert_into(exchange_rate_logs::table)
        .values((
            exchange_rate_logs::report_id.eq(report_id),
            exchange_rate_logs::old_rate.eq(report.exchange_rate.to_string()),
            exchange_rate_logs::new_rate.eq(new_rate.to_string()),
            exchange_rate_logs::rows_recalculated.eq(to_count(rows.len(), "rows")?),
            exchange_rate_logs::refunds_recalculated
                .eq(to_count(report_refunds.len(), "refunds")?),
            exchange_rate_logs::changed_by.eq(changed_by),
            exchange_rate_logs::changed_at.eq(&now),
        ))
        .execute(conn)?;

    info!(
        report_id,
        old_rate = %report.exchange_rate,
        new_rate = %new_rate,
        rows = rows.len(),
        refunds = report_refunds.len(),
        "Report recalculated"
    );

    Ok(RecalculationSummary {
        report_id,
        old_rate: report.exchange_rate,
        new_rate,
        rows_recalculated: rows.len(),
        refunds_recalculated: report_refunds.len(),
    })
}
}

backend_fn! {
/// Inserts a refund and returns its id.
///
/// # Errors
///
/// Returns `ForeignKeyViolation` if the report, liver or agency does not
/// exist, or an error if the insert fails.
pub fn create_refund(conn: &mut _, new: &NewRefund) -> Result<i64, PersistenceError> {
    debug!(report_id = new.report_id, liver_id = ?new.liver_id, "Creating refund");

    diesel::insert_into(refunds::table)
        .values((
            refunds::report_id.eq(new.report_id),
            refunds::liver_id.eq(new.liver_id),
            refunds::agency_id.eq(new.agency_id),
            refunds::amount_usd.eq(new.amount_usd.to_string()),
            refunds::amount_jpy.eq(new.amount_jpy),
            refunds::reason.eq(new.reason.as_deref()),
            refunds::created_by.eq(new.created_by),
            refunds::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;

    let refund_id: i64 = conn.get_last_insert_rowid()?;

    info!(refund_id, report_id = new.report_id, "Refund created");
    Ok(refund_id)
}
}

backend_fn! {
/// Deletes a refund.
///
/// # Errors
///
/// Returns `NotFound` if the refund does not exist.
pub fn delete_refund(conn: &mut _, refund_id: i64) -> Result<(), PersistenceError> {
    let rows_affected: usize = diesel::delete(refunds::table)
        .filter(refunds::refund_id.eq(refund_id))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Refund {refund_id} not found"
        )));
    }

    info!(refund_id, "Refund deleted");
    Ok(())
}
}
