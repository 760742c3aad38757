// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Invoice mutations.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::data_models::NewInvoice;
use crate::diesel_schema::invoices;
use crate::error::PersistenceError;
use crate::timestamp::now_timestamp;

backend_fn! {
/// Inserts an invoice and returns its id.
///
/// # Errors
///
/// Returns `UniqueViolation` if the agency already has an invoice for the
/// report or the invoice number is taken, or an error if the insert fails.
pub fn insert_invoice(conn: &mut _, new: &NewInvoice) -> Result<i64, PersistenceError> {
    diesel::insert_into(invoices::table)
        .values((
            invoices::invoice_number.eq(&new.invoice_number),
            invoices::agency_id.eq(new.agency_id),
            invoices::report_id.eq(new.report_id),
            invoices::issue_date.eq(&new.issue_date),
            invoices::commission_total_jpy.eq(new.commission_total_jpy),
            invoices::refund_total_jpy.eq(new.refund_total_jpy),
            invoices::subtotal_jpy.eq(new.subtotal_jpy),
            invoices::refund_carryover_jpy.eq(new.refund_carryover_jpy),
            invoices::tax_jpy.eq(new.tax_jpy),
            invoices::total_jpy.eq(new.total_jpy),
            invoices::deductible_rate.eq(new.deductible_rate.to_string()),
            invoices::deductible_tax_jpy.eq(new.deductible_tax_jpy),
            invoices::agency_name.eq(&new.agency_name),
            invoices::is_invoice_registered.eq(i32::from(new.is_invoice_registered)),
            invoices::invoice_registration_number.eq(new.invoice_registration_number.as_deref()),
            invoices::bank_name.eq(new.bank.bank_name.as_deref()),
            invoices::bank_branch.eq(new.bank.bank_branch.as_deref()),
            invoices::bank_account_type.eq(new.bank.bank_account_type.as_deref()),
            invoices::bank_account_number.eq(new.bank.bank_account_number.as_deref()),
            invoices::bank_account_holder.eq(new.bank.bank_account_holder.as_deref()),
            invoices::created_by.eq(new.created_by),
            invoices::created_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;

    let invoice_id: i64 = conn.get_last_insert_rowid()?;

    info!(
        invoice_id,
        invoice_number = %new.invoice_number,
        agency_id = new.agency_id,
        report_id = new.report_id,
        total_jpy = new.total_jpy,
        "Invoice issued"
    );
    Ok(invoice_id)
}
}

backend_fn! {
/// Deletes an invoice.
///
/// # Errors
///
/// Returns `NotFound` if the invoice does not exist.
pub fn delete_invoice(conn: &mut _, invoice_id: i64) -> Result<(), PersistenceError> {
    let rows_affected: usize = diesel::delete(invoices::table)
        .filter(invoices::invoice_id.eq(invoice_id))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Invoice {invoice_id} not found"
        )));
    }

    info!(invoice_id, "Invoice deleted");
    Ok(())
}
}
