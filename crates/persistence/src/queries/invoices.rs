// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Invoice queries and the per-agency totals invoices are built from.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_domain::{DataMonth, INVOICE_NUMBER_PREFIX};
use std::collections::BTreeMap;

use crate::data_models::{BankDetails, InvoiceData, InvoiceFilter};
use crate::diesel_schema::{csv_data_rows, invoices, refunds};
use crate::error::PersistenceError;
use crate::queries::parse_decimal;

#[derive(Queryable, Selectable)]
#[diesel(table_name = invoices)]
pub(crate) struct InvoiceRow {
    invoice_id: i64,
    invoice_number: String,
    agency_id: i64,
    report_id: i64,
    issue_date: String,
    commission_total_jpy: i64,
    refund_total_jpy: i64,
    subtotal_jpy: i64,
    refund_carryover_jpy: i64,
    tax_jpy: i64,
    total_jpy: i64,
    deductible_rate: String,
    deductible_tax_jpy: i64,
    agency_name: String,
    is_invoice_registered: i32,
    invoice_registration_number: Option<String>,
    bank_name: Option<String>,
    bank_branch: Option<String>,
    bank_account_type: Option<String>,
    bank_account_number: Option<String>,
    bank_account_holder: Option<String>,
    created_by: i64,
    created_at: String,
}

impl TryFrom<InvoiceRow> for InvoiceData {
    type Error = PersistenceError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            invoice_id: row.invoice_id,
            invoice_number: row.invoice_number,
            agency_id: row.agency_id,
            report_id: row.report_id,
            issue_date: row.issue_date,
            commission_total_jpy: row.commission_total_jpy,
            refund_total_jpy: row.refund_total_jpy,
            subtotal_jpy: row.subtotal_jpy,
            refund_carryover_jpy: row.refund_carryover_jpy,
            tax_jpy: row.tax_jpy,
            total_jpy: row.total_jpy,
            deductible_rate: parse_decimal("deductible_rate", &row.deductible_rate)?,
            deductible_tax_jpy: row.deductible_tax_jpy,
            agency_name: row.agency_name,
            is_invoice_registered: row.is_invoice_registered != 0,
            invoice_registration_number: row.invoice_registration_number,
            bank: BankDetails {
                bank_name: row.bank_name,
                bank_branch: row.bank_branch,
                bank_account_type: row.bank_account_type,
                bank_account_number: row.bank_account_number,
                bank_account_holder: row.bank_account_holder,
            },
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

backend_fn! {
/// Retrieves an invoice by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_invoice(conn: &mut _, invoice_id: i64) -> Result<Option<InvoiceData>, PersistenceError> {
    let row: Option<InvoiceRow> = invoices::table
        .filter(invoices::invoice_id.eq(invoice_id))
        .select(InvoiceRow::as_select())
        .first(conn)
        .optional()?;

    row.map(InvoiceData::try_from).transpose()
}
}

backend_fn! {
/// Retrieves the invoice issued to an agency for a report, if any.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn find_invoice_for_agency_report(
    conn: &mut _,
    agency_id: i64,
    report_id: i64,
) -> Result<Option<InvoiceData>, PersistenceError> {
    let row: Option<InvoiceRow> = invoices::table
        .filter(invoices::agency_id.eq(agency_id))
        .filter(invoices::report_id.eq(report_id))
        .select(InvoiceRow::as_select())
        .first(conn)
        .optional()?;

    row.map(InvoiceData::try_from).transpose()
}
}

backend_fn! {
/// Lists invoices matching `filter`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_invoices(
    conn: &mut _,
    filter: &InvoiceFilter,
) -> Result<Vec<InvoiceData>, PersistenceError> {
    let mut query = invoices::table.into_boxed();

    if let Some(report_id) = filter.report_id {
        query = query.filter(invoices::report_id.eq(report_id));
    }
    if let Some(agency_ids) = &filter.agency_ids {
        query = query.filter(invoices::agency_id.eq_any(agency_ids.clone()));
    }

    let rows: Vec<InvoiceRow> = query
        .order(invoices::invoice_id.desc())
        .select(InvoiceRow::as_select())
        .load(conn)?;

    rows.into_iter().map(InvoiceData::try_from).collect()
}
}

backend_fn! {
/// Returns every invoice number issued for `month`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn invoice_numbers_for_month(
    conn: &mut _,
    month: DataMonth,
) -> Result<Vec<String>, PersistenceError> {
    let pattern: String = format!("{INVOICE_NUMBER_PREFIX}-{}-%", month.compact());
    let numbers: Vec<String> = invoices::table
        .filter(invoices::invoice_number.like(pattern))
        .select(invoices::invoice_number)
        .load(conn)?;
    Ok(numbers)
}
}

backend_fn! {
/// Sums commission JPY per agency for a report.
///
/// Rows without an agency are skipped.
///
/// # Errors
///
/// Returns an error if the query fails or a sum overflows.
pub fn commission_totals_by_agency(
    conn: &mut _,
    report_id: i64,
) -> Result<BTreeMap<i64, i64>, PersistenceError> {
    let pairs: Vec<(Option<i64>, i64)> = csv_data_rows::table
        .filter(csv_data_rows::report_id.eq(report_id))
        .select((csv_data_rows::agency_id, csv_data_rows::commission_jpy))
        .load(conn)?;

    sum_by_agency(pairs)
}
}

backend_fn! {
/// Sums refund JPY per agency for a report, using the agency recorded on
/// each refund.
///
/// # Errors
///
/// Returns an error if the query fails or a sum overflows.
pub fn refund_totals_by_agency(
    conn: &mut _,
    report_id: i64,
) -> Result<BTreeMap<i64, i64>, PersistenceError> {
    let pairs: Vec<(Option<i64>, i64)> = refunds::table
        .filter(refunds::report_id.eq(report_id))
        .select((refunds::agency_id, refunds::amount_jpy))
        .load(conn)?;

    sum_by_agency(pairs)
}
}

fn sum_by_agency(pairs: Vec<(Option<i64>, i64)>) -> Result<BTreeMap<i64, i64>, PersistenceError> {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for (agency_id, amount) in pairs {
        let Some(agency_id) = agency_id else {
            continue;
        };
        let entry = totals.entry(agency_id).or_insert(0);
        *entry = entry.checked_add(amount).ok_or_else(|| {
            PersistenceError::Other(format!("JPY total overflow for agency {agency_id}"))
        })?;
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::sum_by_agency;

    #[test]
    fn test_sum_by_agency_groups_and_skips_unassigned() {
        let totals = sum_by_agency(vec![(Some(1), 100), (None, 999), (Some(2), 5), (Some(1), 50)])
            .unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&1], 150);
        assert_eq!(totals[&2], 5);
    }

    #[test]
    fn test_sum_by_agency_reports_overflow() {
        assert!(sum_by_agency(vec![(Some(1), i64::MAX), (Some(1), 1)]).is_err());
    }
}
