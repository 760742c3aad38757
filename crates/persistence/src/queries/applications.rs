// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Application queries.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};

use crate::data_models::{ApplicationData, ApplicationFilter};
use crate::diesel_schema::applications;
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = applications)]
pub(crate) struct ApplicationRow {
    application_id: i64,
    form_type: String,
    status: String,
    applicant_name: String,
    applicant_email: Option<String>,
    tiktok_handle: Option<String>,
    tiktok_user_id: Option<String>,
    agency_id: Option<i64>,
    payload_json: String,
    liver_id: Option<i64>,
    submitted_by: Option<i64>,
    reviewer_operator_id: Option<i64>,
    review_note: Option<String>,
    version: i32,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ApplicationRow> for ApplicationData {
    type Error = PersistenceError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            application_id: row.application_id,
            form_type: row.form_type.parse()?,
            status: row.status.parse()?,
            applicant_name: row.applicant_name,
            applicant_email: row.applicant_email,
            tiktok_handle: row.tiktok_handle,
            tiktok_user_id: row.tiktok_user_id,
            agency_id: row.agency_id,
            payload: serde_json::from_str(&row.payload_json)?,
            liver_id: row.liver_id,
            submitted_by: row.submitted_by,
            reviewer_operator_id: row.reviewer_operator_id,
            review_note: row.review_note,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

backend_fn! {
/// Retrieves an application by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_application(
    conn: &mut _,
    application_id: i64,
) -> Result<Option<ApplicationData>, PersistenceError> {
    let row: Option<ApplicationRow> = applications::table
        .filter(applications::application_id.eq(application_id))
        .select(ApplicationRow::as_select())
        .first(conn)
        .optional()?;

    row.map(ApplicationData::try_from).transpose()
}
}

backend_fn! {
/// Lists applications matching `filter`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_applications(
    conn: &mut _,
    filter: &ApplicationFilter,
) -> Result<Vec<ApplicationData>, PersistenceError> {
    let mut query = applications::table.into_boxed();

    if let Some(form_type) = filter.form_type {
        query = query.filter(applications::form_type.eq(form_type.as_str()));
    }
    if let Some(status) = filter.status {
        query = query.filter(applications::status.eq(status.as_str()));
    }
    if let Some(agency_ids) = &filter.agency_ids {
        query = query.filter(applications::agency_id.eq_any(agency_ids.clone()));
    }

    let rows: Vec<ApplicationRow> = query
        .order(applications::application_id.desc())
        .select(ApplicationRow::as_select())
        .load(conn)?;

    rows.into_iter().map(ApplicationData::try_from).collect()
}
}
