// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Agency mutations.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::data_models::{AgencyUpdate, NewAgency};
use crate::diesel_schema::agencies;
use crate::error::PersistenceError;
use crate::queries::agencies::AgencyReferences;
use crate::timestamp::now_timestamp;

backend_fn! {
/// Inserts an agency and returns its id.
///
/// # Errors
///
/// Returns `UniqueViolation` if the code is taken, `ForeignKeyViolation` if
/// the parent does not exist, or an error if the insert fails.
pub fn create_agency(conn: &mut _, new: &NewAgency) -> Result<i64, PersistenceError> {
    info!(code = %new.code, name = %new.name, "Creating agency");

    let now: String = now_timestamp()?;

    diesel::insert_into(agencies::table)
        .values((
            agencies::name.eq(&new.name),
            agencies::code.eq(&new.code),
            agencies::commission_rate.eq(new.commission_rate.to_string()),
            agencies::agency_rank.eq(new.rank.as_str()),
            agencies::parent_agency_id.eq(new.parent_agency_id),
            agencies::contact_email.eq(new.contact_email.as_deref()),
            agencies::bank_name.eq(new.bank.bank_name.as_deref()),
            agencies::bank_branch.eq(new.bank.bank_branch.as_deref()),
            agencies::bank_account_type.eq(new.bank.bank_account_type.as_deref()),
            agencies::bank_account_number.eq(new.bank.bank_account_number.as_deref()),
            agencies::bank_account_holder.eq(new.bank.bank_account_holder.as_deref()),
            agencies::invoice_registration_number.eq(new.invoice_registration_number.as_deref()),
            agencies::is_invoice_registered
                .eq(i32::from(new.invoice_registration_number.is_some())),
            agencies::created_at.eq(&now),
            agencies::updated_at.eq(&now),
        ))
        .execute(conn)?;

    let agency_id: i64 = conn.get_last_insert_rowid()?;

    info!(agency_id, "Agency created");
    Ok(agency_id)
}
}

backend_fn! {
/// Replaces an agency's editable fields.
///
/// # Errors
///
/// Returns `NotFound` if the agency does not exist, `UniqueViolation` if
/// the new code is taken, or an error if the update fails.
pub fn update_agency(
    conn: &mut _,
    agency_id: i64,
    update: &AgencyUpdate,
) -> Result<(), PersistenceError> {
    info!(agency_id, code = %update.code, "Updating agency");

    let rows_affected: usize = diesel::update(agencies::table)
        .filter(agencies::agency_id.eq(agency_id))
        .set((
            agencies::name.eq(&update.name),
            agencies::code.eq(&update.code),
            agencies::commission_rate.eq(update.commission_rate.to_string()),
            agencies::agency_rank.eq(update.rank.as_str()),
            agencies::parent_agency_id.eq(update.parent_agency_id),
            agencies::contact_email.eq(update.contact_email.as_deref()),
            agencies::bank_name.eq(update.bank.bank_name.as_deref()),
            agencies::bank_branch.eq(update.bank.bank_branch.as_deref()),
            agencies::bank_account_type.eq(update.bank.bank_account_type.as_deref()),
            agencies::bank_account_number.eq(update.bank.bank_account_number.as_deref()),
            agencies::bank_account_holder.eq(update.bank.bank_account_holder.as_deref()),
            agencies::invoice_registration_number
                .eq(update.invoice_registration_number.as_deref()),
            agencies::is_invoice_registered
                .eq(i32::from(update.invoice_registration_number.is_some())),
            agencies::updated_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Agency {agency_id} not found"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Deletes an agency that nothing references any more.
///
/// `references` must have been counted inside the same transaction.
///
/// # Errors
///
/// Returns `Referenced` if any blocking reference remains, `NotFound` if the
/// agency does not exist, or an error if the delete fails.
pub fn delete_agency(
    conn: &mut _,
    agency_id: i64,
    references: &AgencyReferences,
) -> Result<(), PersistenceError> {
    if let Some(reason) = references.blocking_reason() {
        return Err(PersistenceError::Referenced {
            entity: "Agency",
            id: agency_id,
            reason,
        });
    }

    let rows_affected: usize = diesel::delete(agencies::table)
        .filter(agencies::agency_id.eq(agency_id))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Agency {agency_id} not found"
        )));
    }

    info!(agency_id, "Agency deleted");
    Ok(())
}
}
