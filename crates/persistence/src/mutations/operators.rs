// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Operator and session mutations.
//!
//! Most mutations use Diesel DSL, with the few backend-specific helpers
//! reached through the `PersistenceBackend` trait.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::diesel_schema::{operators, sessions};
use crate::error::PersistenceError;
use crate::timestamp::now_timestamp;

/// Fields for a new operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOperator<'a> {
    pub login_name: &'a str,
    pub display_name: &'a str,
    pub password: &'a str,
    /// `Admin` or `Agency`.
    pub role: &'a str,
    pub agency_id: Option<i64>,
    pub must_change_password: bool,
}

/// Hashes a password with bcrypt at the default cost.
pub(crate) fn hash_password(password: &str) -> Result<String, PersistenceError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| PersistenceError::Other(format!("Failed to hash password: {e}")))
}

backend_fn! {
/// Creates a new operator.
///
/// The login name is normalized to upper case for case-insensitive
/// uniqueness and the password is stored as a bcrypt hash.
///
/// # Errors
///
/// Returns `UniqueViolation` if the login name is taken, or an error if
/// hashing or the insert fails.
pub fn create_operator(conn: &mut _, new: &NewOperator<'_>) -> Result<i64, PersistenceError> {
    let normalized_login: String = new.login_name.trim().to_uppercase();

    info!(
        login_name = %normalized_login,
        role = new.role,
        agency_id = ?new.agency_id,
        "Creating operator"
    );

    let password_hash: String = hash_password(new.password)?;
    let created_at: String = now_timestamp()?;

    diesel::insert_into(operators::table)
        .values((
            operators::login_name.eq(&normalized_login),
            operators::display_name.eq(new.display_name.trim()),
            operators::password_hash.eq(&password_hash),
            operators::role.eq(new.role),
            operators::agency_id.eq(new.agency_id),
            operators::is_disabled.eq(0),
            operators::must_change_password.eq(i32::from(new.must_change_password)),
            operators::created_at.eq(&created_at),
        ))
        .execute(conn)?;

    let operator_id: i64 = conn.get_last_insert_rowid()?;

    info!(operator_id, "Operator created");
    Ok(operator_id)
}
}

backend_fn! {
/// Records a successful login.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_last_login(conn: &mut _, operator_id: i64) -> Result<(), PersistenceError> {
    debug!(operator_id, "Updating last_login_at");

    diesel::update(operators::table)
        .filter(operators::operator_id.eq(operator_id))
        .set(operators::last_login_at.eq(Some(now_timestamp()?)))
        .execute(conn)?;

    Ok(())
}
}

backend_fn! {
/// Disables an operator and records when.
///
/// # Errors
///
/// Returns `NotFound` if no such operator exists.
pub fn disable_operator(conn: &mut _, operator_id: i64) -> Result<(), PersistenceError> {
    info!(operator_id, "Disabling operator");

    let rows_affected: usize = diesel::update(operators::table)
        .filter(operators::operator_id.eq(operator_id))
        .set((
            operators::is_disabled.eq(1),
            operators::disabled_at.eq(Some(now_timestamp()?)),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Operator {operator_id} not found"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Re-enables a disabled operator.
///
/// # Errors
///
/// Returns `NotFound` if no such operator exists.
pub fn enable_operator(conn: &mut _, operator_id: i64) -> Result<(), PersistenceError> {
    info!(operator_id, "Re-enabling operator");

    let rows_affected: usize = diesel::update(operators::table)
        .filter(operators::operator_id.eq(operator_id))
        .set((
            operators::is_disabled.eq(0),
            operators::disabled_at.eq(None::<String>),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Operator {operator_id} not found"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Replaces an operator's password and clears the forced-change flag.
///
/// # Errors
///
/// Returns an error if hashing or the update fails.
pub fn update_password(
    conn: &mut _,
    operator_id: i64,
    new_password: &str,
) -> Result<(), PersistenceError> {
    info!(operator_id, "Updating password");

    let password_hash: String = hash_password(new_password)?;

    let rows_affected: usize = diesel::update(operators::table)
        .filter(operators::operator_id.eq(operator_id))
        .set((
            operators::password_hash.eq(&password_hash),
            operators::must_change_password.eq(0),
        ))
        .execute(conn)?;

    if rows_affected == 0 {
        return Err(PersistenceError::NotFound(format!(
            "Operator {operator_id} not found"
        )));
    }
    Ok(())
}
}

backend_fn! {
/// Detaches every operator of an agency and disables them.
///
/// Returns the ids of the affected operators so their sessions can be
/// revoked in the same transaction.
///
/// # Errors
///
/// Returns an error if the query or update fails.
pub fn detach_agency_operators(
    conn: &mut _,
    agency_id: i64,
) -> Result<Vec<i64>, PersistenceError> {
    let operator_ids: Vec<i64> = operators::table
        .filter(operators::agency_id.eq(agency_id))
        .select(operators::operator_id)
        .load(conn)?;

    if operator_ids.is_empty() {
        return Ok(operator_ids);
    }

    let disabled_at: String = now_timestamp()?;
    diesel::update(operators::table)
        .filter(operators::agency_id.eq(agency_id))
        .set((
            operators::agency_id.eq(None::<i64>),
            operators::is_disabled.eq(1),
            operators::disabled_at.eq(Some(disabled_at)),
        ))
        .execute(conn)?;

    diesel::delete(sessions::table)
        .filter(sessions::operator_id.eq_any(operator_ids.clone()))
        .execute(conn)?;

    info!(agency_id, count = operator_ids.len(), "Detached agency operators");
    Ok(operator_ids)
}
}

backend_fn! {
/// Creates a new session for an operator.
///
/// `expires_at` uses the storage timestamp format.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn create_session(
    conn: &mut _,
    session_token: &str,
    operator_id: i64,
    expires_at: &str,
) -> Result<i64, PersistenceError> {
    debug!(operator_id, expires_at, "Creating session");

    let now: String = now_timestamp()?;

    diesel::insert_into(sessions::table)
        .values((
            sessions::session_token.eq(session_token),
            sessions::operator_id.eq(operator_id),
            sessions::created_at.eq(&now),
            sessions::last_activity_at.eq(&now),
            sessions::expires_at.eq(expires_at),
        ))
        .execute(conn)?;

    let session_id: i64 = conn.get_last_insert_rowid()?;

    debug!(session_id, operator_id, "Session created");
    Ok(session_id)
}
}

backend_fn! {
/// Touches a session's last activity time.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_session_activity(conn: &mut _, session_id: i64) -> Result<(), PersistenceError> {
    diesel::update(sessions::table)
        .filter(sessions::session_id.eq(session_id))
        .set(sessions::last_activity_at.eq(now_timestamp()?))
        .execute(conn)?;

    Ok(())
}
}

backend_fn! {
/// Deletes a session by token. Used for logout.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_session(conn: &mut _, session_token: &str) -> Result<(), PersistenceError> {
    debug!("Deleting session by token");

    diesel::delete(sessions::table)
        .filter(sessions::session_token.eq(session_token))
        .execute(conn)?;

    Ok(())
}
}

backend_fn! {
/// Deletes every session whose expiry has passed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_expired_sessions(conn: &mut _) -> Result<usize, PersistenceError> {
    let now: String = now_timestamp()?;

    let rows_affected: usize = diesel::delete(sessions::table)
        .filter(sessions::expires_at.le(&now))
        .execute(conn)?;

    info!(rows_affected, "Deleted expired sessions");
    Ok(rows_affected)
}
}

backend_fn! {
/// Deletes all sessions of an operator.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_sessions_for_operator(
    conn: &mut _,
    operator_id: i64,
) -> Result<usize, PersistenceError> {
    let rows_affected: usize = diesel::delete(sessions::table)
        .filter(sessions::operator_id.eq(operator_id))
        .execute(conn)?;

    info!(operator_id, rows_affected, "Deleted operator sessions");
    Ok(rows_affected)
}
}

backend_fn! {
/// Deletes all sessions of an operator except `keep_session_id`.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_other_sessions(
    conn: &mut _,
    operator_id: i64,
    keep_session_id: i64,
) -> Result<usize, PersistenceError> {
    let rows_affected: usize = diesel::delete(sessions::table)
        .filter(sessions::operator_id.eq(operator_id))
        .filter(sessions::session_id.ne(keep_session_id))
        .execute(conn)?;

    info!(operator_id, rows_affected, "Revoked other sessions");
    Ok(rows_affected)
}
}
