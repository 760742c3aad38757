// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Liver roster mutations.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_domain::LiverStatus;
use tracing::info;

use crate::backend::PersistenceBackend;
use crate::data_models::{LiverUpdate, NewLiver};
use crate::diesel_schema::livers;
use crate::error::PersistenceError;
use crate::timestamp::now_timestamp;

backend_fn! {
/// Inserts a liver and returns its id.
///
/// # Errors
///
/// Returns `UniqueViolation` if the TikTok user id is already on the roster,
/// `ForeignKeyViolation` if the agency does not exist, or an error if the
/// insert fails.
pub fn create_liver(conn: &mut _, new: &NewLiver) -> Result<i64, PersistenceError> {
    info!(handle = %new.tiktok_handle, agency_id = ?new.agency_id, "Creating liver");

    let now: String = now_timestamp()?;

    diesel::insert_into(livers::table)
        .values((
            livers::tiktok_user_id.eq(new.tiktok_user_id.as_deref()),
            livers::tiktok_handle.eq(&new.tiktok_handle),
            livers::display_name.eq(&new.display_name),
            livers::real_name.eq(new.real_name.as_deref()),
            livers::email.eq(new.email.as_deref()),
            livers::status.eq(new.status.as_str()),
            livers::agency_id.eq(new.agency_id),
            livers::joined_at.eq(new.joined_at.as_deref()),
            livers::notes.eq(new.notes.as_deref()),
            livers::created_at.eq(&now),
            livers::updated_at.eq(&now),
        ))
        .execute(conn)?;

    let liver_id: i64 = conn.get_last_insert_rowid()?;

    info!(liver_id, "Liver created");
    Ok(liver_id)
}
}

backend_fn! {
/// Replaces a liver's editable fields.
///
/// # Errors
///
/// Returns `NotFound` if the liver does not exist, or an error if the update
/// fails.
pub fn update_liver(
    conn: &mut _,
    liver_id: i64,
    update: &LiverUpdate,
) -> Result<(), PersistenceError> {
    info!(liver_id, "Updating liver");

    let rows_affected: usize = diesel::update(livers::table)
        .filter(livers::liver_id.eq(liver_id))
        .set((
            livers::tiktok_user_id.eq(update.tiktok_user_id.as_deref()),
            livers::tiktok_handle.eq(&update.tiktok_handle),
            livers::display_name.eq(&update.display_name),
            livers::real_name.eq(update.real_name.as_deref()),
            livers::email.eq(update.email.as_deref()),
            livers::status.eq(update.status.as_str()),
            livers::agency_id.eq(update.agency_id),
            livers::joined_at.eq(update.joined_at.as_deref()),
            livers::notes.eq(update.notes.as_deref()),
            livers::updated_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Liver {liver_id} not found"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Sets the status of several livers at once and returns how many changed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn bulk_update_liver_status(
    conn: &mut _,
    liver_ids: &[i64],
    status: LiverStatus,
) -> Result<usize, PersistenceError> {
    if liver_ids.is_empty() {
        return Ok(0);
    }

    let rows_affected: usize = diesel::update(livers::table)
        .filter(livers::liver_id.eq_any(liver_ids.to_vec()))
        .set((
            livers::status.eq(status.as_str()),
            livers::updated_at.eq(now_timestamp()?),
        ))
        .execute(conn)?;

    info!(rows_affected, status = status.as_str(), "Bulk liver status update");
    Ok(rows_affected)
}
}
