// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Application mutations.
//!
//! Status changes use optimistic locking: the update only applies when the
//! row still has the version and status the caller read.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_domain::ApplicationStatus;
use tracing::{info, warn};

use crate::backend::PersistenceBackend;
use crate::data_models::{ApplicationTransition, NewApplication};
use crate::diesel_schema::applications;
use crate::error::PersistenceError;
use crate::timestamp::now_timestamp;

backend_fn! {
/// Inserts a pending application at version 1 and returns its id.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized or the insert fails.
pub fn create_application(conn: &mut _, new: &NewApplication) -> Result<i64, PersistenceError> {
    info!(form_type = new.form_type.as_str(), agency_id = ?new.agency_id, "Creating application");

    let payload_json: String = serde_json::to_string(&new.payload)?;
    let now: String = now_timestamp()?;

    diesel::insert_into(applications::table)
        .values((
            applications::form_type.eq(new.form_type.as_str()),
            applications::status.eq(ApplicationStatus::Pending.as_str()),
            applications::applicant_name.eq(&new.applicant_name),
            applications::applicant_email.eq(new.applicant_email.as_deref()),
            applications::tiktok_handle.eq(new.tiktok_handle.as_deref()),
            applications::tiktok_user_id.eq(new.tiktok_user_id.as_deref()),
            applications::agency_id.eq(new.agency_id),
            applications::payload_json.eq(&payload_json),
            applications::submitted_by.eq(new.submitted_by),
            applications::version.eq(1),
            applications::created_at.eq(&now),
            applications::updated_at.eq(&now),
        ))
        .execute(conn)?;

    let application_id: i64 = conn.get_last_insert_rowid()?;

    info!(application_id, "Application created");
    Ok(application_id)
}
}

backend_fn! {
/// Applies a status transition and returns the new version.
///
/// `created_liver` links the application to a liver created for it.
///
/// # Errors
///
/// Returns `NotFound` if the application does not exist, `StaleWrite` if its
/// version or status changed since it was read, or an error if the update
/// fails.
pub fn transition_application(
    conn: &mut _,
    transition: &ApplicationTransition,
    created_liver: Option<i64>,
) -> Result<i32, PersistenceError> {
    let id: i64 = transition.application_id;
    let now: String = now_timestamp()?;

    let target = applications::table
        .filter(applications::application_id.eq(id))
        .filter(applications::version.eq(transition.expected_version))
        .filter(applications::status.eq(transition.from.as_str()));

    let rows_affected: usize = match created_liver {
        Some(liver_id) => diesel::update(target)
            .set((
                applications::status.eq(transition.to.as_str()),
                applications::version.eq(applications::version + 1),
                applications::reviewer_operator_id.eq(Some(transition.reviewer_operator_id)),
                applications::review_note.eq(transition.review_note.as_deref()),
                applications::liver_id.eq(Some(liver_id)),
                applications::updated_at.eq(&now),
            ))
            .execute(conn)?,
        None => diesel::update(target)
            .set((
                applications::status.eq(transition.to.as_str()),
                applications::version.eq(applications::version + 1),
                applications::reviewer_operator_id.eq(Some(transition.reviewer_operator_id)),
                applications::review_note.eq(transition.review_note.as_deref()),
                applications::updated_at.eq(&now),
            ))
            .execute(conn)?,
    };

    if rows_affected == 0 {
        let exists: i64 = applications::table
            .filter(applications::application_id.eq(id))
            .count()
            .get_result(conn)?;
        if exists == 0 {
            return Err(PersistenceError::NotFound(format!(
                "Application {id} not found"
            )));
        }
        warn!(
            application_id = id,
            expected_version = transition.expected_version,
            "Stale application transition"
        );
        return Err(PersistenceError::StaleWrite {
            entity: "Application",
            id,
            expected_version: transition.expected_version,
        });
    }

    info!(
        application_id = id,
        from = transition.from.as_str(),
        to = transition.to.as_str(),
        "Application transitioned"
    );
    Ok(transition.expected_version + 1)
}
}
