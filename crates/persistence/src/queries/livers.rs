// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Liver roster queries.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::debug;

use crate::data_models::{LiverData, LiverFilter};
use crate::diesel_schema::livers;
use crate::error::PersistenceError;

diesel::define_sql_function!(fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text);

#[derive(Queryable, Selectable)]
#[diesel(table_name = livers)]
pub(crate) struct LiverRow {
    liver_id: i64,
    tiktok_user_id: Option<String>,
    tiktok_handle: String,
    display_name: String,
    real_name: Option<String>,
    email: Option<String>,
    status: String,
    agency_id: Option<i64>,
    joined_at: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<LiverRow> for LiverData {
    type Error = PersistenceError;

    fn try_from(row: LiverRow) -> Result<Self, Self::Error> {
        Ok(Self {
            liver_id: row.liver_id,
            tiktok_user_id: row.tiktok_user_id,
            tiktok_handle: row.tiktok_handle,
            display_name: row.display_name,
            real_name: row.real_name,
            email: row.email,
            status: row.status.parse()?,
            agency_id: row.agency_id,
            joined_at: row.joined_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

backend_fn! {
/// Retrieves a liver by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_liver(conn: &mut _, liver_id: i64) -> Result<Option<LiverData>, PersistenceError> {
    let row: Option<LiverRow> = livers::table
        .filter(livers::liver_id.eq(liver_id))
        .select(LiverRow::as_select())
        .first(conn)
        .optional()?;

    row.map(LiverData::try_from).transpose()
}
}

backend_fn! {
/// Retrieves a liver by TikTok user id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn get_liver_by_tiktok_user_id(
    conn: &mut _,
    tiktok_user_id: &str,
) -> Result<Option<LiverData>, PersistenceError> {
    let row: Option<LiverRow> = livers::table
        .filter(livers::tiktok_user_id.eq(tiktok_user_id.trim()))
        .select(LiverRow::as_select())
        .first(conn)
        .optional()?;

    row.map(LiverData::try_from).transpose()
}
}

backend_fn! {
/// Finds a liver by handle, ignoring a leading `@` and letter case.
///
/// When several livers share a handle the oldest record wins.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn find_liver_by_handle(
    conn: &mut _,
    handle: &str,
) -> Result<Option<LiverData>, PersistenceError> {
    let trimmed = handle.trim();
    let wanted = trimmed.strip_prefix('@').unwrap_or(trimmed).to_lowercase();
    debug!(handle = %wanted, "Looking up liver by handle");

    let row: Option<LiverRow> = livers::table
        .filter(lower(livers::tiktok_handle).eq(&wanted))
        .order(livers::liver_id.asc())
        .select(LiverRow::as_select())
        .first(conn)
        .optional()?;

    row.map(LiverData::try_from).transpose()
}
}

backend_fn! {
/// Lists livers matching `filter`, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_livers(conn: &mut _, filter: &LiverFilter) -> Result<Vec<LiverData>, PersistenceError> {
    let mut query = livers::table.into_boxed();

    if let Some(agency_ids) = &filter.agency_ids {
        query = query.filter(livers::agency_id.eq_any(agency_ids.clone()));
    }
    if let Some(status) = filter.status {
        query = query.filter(livers::status.eq(status.as_str()));
    }

    let rows: Vec<LiverRow> = query
        .order(livers::liver_id.asc())
        .select(LiverRow::as_select())
        .load(conn)?;

    rows.into_iter().map(LiverData::try_from).collect()
}
}
