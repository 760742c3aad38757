// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for LiverDesk.
//!
//! This crate stores operators, sessions, agencies, livers, applications,
//! monthly reports, refunds, invoices and the audit trail. It is built on
//! Diesel and supports two database backends.
//!
//! ## Database Backend Support
//!
//! - **`SQLite`** (default) for development, unit tests and single-host installs
//! - **`MariaDB`/`MySQL`**, validated via explicit opt-in tests
//!
//! `MySQL` support is always compiled in but only exercised by tests marked
//! `#[ignore]`:
//! ```bash
//! cargo xtask test-mariadb
//! ```
//!
//! ## Migration Strategy
//!
//! SQL syntax differs between backends, so there are two migration
//! directories that must describe the same schema:
//!
//! - `migrations/`: `SQLite`
//! - `migrations_mysql/`: `MySQL`/`MariaDB`
//!
//! `cargo xtask verify-migrations` checks that they stay in step.
//!
//! ## Transactions and Audit
//!
//! Every mutating method takes the `AuditEvent` describing the change and
//! stores it in the same transaction as the change itself. Creations link the
//! event to the id of the new record.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_audit::AuditEvent;
use liverdesk_domain::{DataMonth, ExchangeRate, LiverStatus};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential id.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates monomorphic backend-specific query/mutation functions.
///
/// From a single body this produces:
/// - `name_sqlite` taking `&mut SqliteConnection`
/// - `name_mysql` taking `&mut MysqlConnection`
///
/// Diesel needs a concrete backend type at compile time, so generic
/// functions over both connections are not an option.
///
/// # Constraints
///
/// - The macro only duplicates the body and substitutes the connection type
/// - Backend dispatch happens exclusively in the `Persistence` adapter
/// - A body cannot call another generated function; compose those in the
///   adapter instead
///
/// # Usage
///
/// ```ignore
/// backend_fn! {
///     pub fn my_query(conn: &mut _, param: i64) -> Result<String, PersistenceError> {
///         diesel_schema::table::table
///             .filter(diesel_schema::table::id.eq(param))
///             .first::<String>(conn)
///             .map_err(Into::into)
///     }
/// }
/// ```
macro_rules! backend_fn {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident (
            $conn:ident : &mut _
            $(, $param:ident : $param_ty:ty)* $(,)?
        ) -> $ret:ty
        $body:block
    ) => {
        pastey::paste! {
            $(#[$meta])*
            $vis fn [<$name _sqlite>] (
                $conn: &mut SqliteConnection
                $(, $param : $param_ty)*
            ) -> $ret
            $body

            $(#[$meta])*
            $vis fn [<$name _mysql>] (
                $conn: &mut MysqlConnection
                $(, $param : $param_ty)*
            ) -> $ret
            $body
        }
    };
}

/// Calls the backend variant of a generated function on the active
/// connection.
macro_rules! dispatch {
    ($self:ident, $($module:ident)::+ , $name:ident ( $($arg:expr),* $(,)? )) => {
        pastey::paste! {
            match &mut $self.conn {
                BackendConnection::Sqlite(conn) => $($module)::+ :: [<$name _sqlite>](conn $(, $arg)*),
                BackendConnection::Mysql(conn) => $($module)::+ :: [<$name _mysql>](conn $(, $arg)*),
            }
        }
    };
}

/// Runs one generated mutation and stores its audit event in a single
/// transaction.
///
/// With `link`, the mutation must return the new record's id and the event is
/// pointed at it.
macro_rules! audited {
    (link $self:ident, $event:expr, $($module:ident)::+ , $name:ident ( $($arg:expr),* $(,)? )) => {
        pastey::paste! {
            match &mut $self.conn {
                BackendConnection::Sqlite(conn) => conn.transaction::<_, PersistenceError, _>(|conn| {
                    let id: i64 = $($module)::+ :: [<$name _sqlite>](conn $(, $arg)*)?;
                    conn.insert_audit_event(&$event.clone().with_entity_id(id))?;
                    Ok(id)
                }),
                BackendConnection::Mysql(conn) => conn.transaction::<_, PersistenceError, _>(|conn| {
                    let id: i64 = $($module)::+ :: [<$name _mysql>](conn $(, $arg)*)?;
                    conn.insert_audit_event(&$event.clone().with_entity_id(id))?;
                    Ok(id)
                }),
            }
        }
    };
    ($self:ident, $event:expr, $($module:ident)::+ , $name:ident ( $($arg:expr),* $(,)? )) => {
        pastey::paste! {
            match &mut $self.conn {
                BackendConnection::Sqlite(conn) => conn.transaction::<_, PersistenceError, _>(|conn| {
                    let result = $($module)::+ :: [<$name _sqlite>](conn $(, $arg)*)?;
                    conn.insert_audit_event($event)?;
                    Ok(result)
                }),
                BackendConnection::Mysql(conn) => conn.transaction::<_, PersistenceError, _>(|conn| {
                    let result = $($module)::+ :: [<$name _mysql>](conn $(, $arg)*)?;
                    conn.insert_audit_event($event)?;
                    Ok(result)
                }),
            }
        }
    };
}

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;
mod timestamp;

#[cfg(test)]
mod tests;

pub use data_models::{
    AgencyData, AgencyUpdate, ApplicationData, ApplicationFilter, ApplicationTransition,
    AuditEventRecord, BankDetails, ExchangeRateLogData, ImportOutcome, InvoiceData,
    InvoiceFilter, LiverData, LiverFilter, LiverUpdate, NewAgency, NewApplication, NewInvoice,
    NewLiver, NewRefund, NewReport, NewReportRow, OperatorData, RecalculationSummary,
    RefundData, ReportData, ReportRowData, SessionData,
};
pub use error::PersistenceError;
pub use mutations::operators::NewOperator;
pub use queries::agencies::AgencyReferences;
pub use queries::operators::verify_password;
pub use timestamp::{TIMESTAMP_FORMAT, format_timestamp, now_timestamp, parse_timestamp};

use backend::PersistenceBackend;

/// Role stored for administrator accounts.
pub const ROLE_ADMIN: &str = "Admin";
/// Role stored for agency accounts.
pub const ROLE_AGENCY: &str = "Agency";

/// Backend-specific database connection.
pub enum BackendConnection {
    Sqlite(SqliteConnection),
    Mysql(MysqlConnection),
}

/// Persistence adapter.
///
/// Backend selection happens once at construction time and is transparent
/// to callers.
pub struct Persistence {
    pub(crate) conn: BackendConnection,
}

impl Persistence {
    /// Creates a persistence adapter over a fresh in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url = format!("file:liverdesk_memdb_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self {
            conn: BackendConnection::Sqlite(conn),
        })
    }

    /// Creates a persistence adapter over a `SQLite` database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        backend::sqlite::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self {
            conn: BackendConnection::Sqlite(conn),
        })
    }

    /// Creates a persistence adapter over a `MySQL`/`MariaDB` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_mysql(database_url: &str) -> Result<Self, PersistenceError> {
        let mut conn: MysqlConnection = backend::mysql::initialize_database(database_url)?;
        backend::mysql::verify_foreign_key_enforcement(&mut conn)?;

        Ok(Self {
            conn: BackendConnection::Mysql(conn),
        })
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.verify_foreign_key_enforcement(),
            BackendConnection::Mysql(conn) => conn.verify_foreign_key_enforcement(),
        }
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Stores a standalone audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record_audit_event(&mut self, event: &AuditEvent) -> Result<i64, PersistenceError> {
        dispatch!(self, mutations::audit, insert_audit_event(event))
    }

    /// Lists the most recent audit events, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_audit_events(
        &mut self,
        entity_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditEventRecord>, PersistenceError> {
        dispatch!(self, queries::audit, list_audit_events(entity_type, limit))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Creates an operator account.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the login name is taken.
    pub fn create_operator(
        &mut self,
        new: &NewOperator<'_>,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::operators, create_operator(new))
    }

    /// Retrieves an operator by login name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_operator_by_login(
        &mut self,
        login_name: &str,
    ) -> Result<Option<OperatorData>, PersistenceError> {
        dispatch!(self, queries::operators, get_operator_by_login(login_name))
    }

    /// Retrieves an operator by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_operator_by_id(
        &mut self,
        operator_id: i64,
    ) -> Result<Option<OperatorData>, PersistenceError> {
        dispatch!(self, queries::operators, get_operator_by_id(operator_id))
    }

    /// Lists all operators ordered by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_operators(&mut self) -> Result<Vec<OperatorData>, PersistenceError> {
        dispatch!(self, queries::operators, list_operators())
    }

    /// Counts all operators.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_operators(&mut self) -> Result<i64, PersistenceError> {
        dispatch!(self, queries::operators, count_operators())
    }

    /// Counts enabled administrators.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_active_admin_operators(&mut self) -> Result<i64, PersistenceError> {
        dispatch!(self, queries::operators, count_active_admin_operators())
    }

    /// Records a successful login.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_last_login(&mut self, operator_id: i64) -> Result<(), PersistenceError> {
        dispatch!(self, mutations::operators, update_last_login(operator_id))
    }

    /// Disables an operator and revokes all of its sessions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator does not exist.
    pub fn disable_operator(
        &mut self,
        operator_id: i64,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                mutations::operators::disable_operator_sqlite(conn, operator_id)?;
                mutations::operators::delete_sessions_for_operator_sqlite(conn, operator_id)?;
                conn.insert_audit_event(event)?;
                Ok(())
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                mutations::operators::disable_operator_mysql(conn, operator_id)?;
                mutations::operators::delete_sessions_for_operator_mysql(conn, operator_id)?;
                conn.insert_audit_event(event)?;
                Ok(())
            }),
        }
    }

    /// Re-enables a disabled operator.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator does not exist.
    pub fn enable_operator(
        &mut self,
        operator_id: i64,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        audited!(self, event, mutations::operators, enable_operator(operator_id))
    }

    /// Checks a password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is malformed.
    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, PersistenceError> {
        verify_password(password, password_hash)
    }

    /// Replaces an operator's password, clears the forced-change flag and
    /// revokes every session except `keep_session_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator does not exist.
    pub fn update_password(
        &mut self,
        operator_id: i64,
        new_password: &str,
        keep_session_id: Option<i64>,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                mutations::operators::update_password_sqlite(conn, operator_id, new_password)?;
                match keep_session_id {
                    Some(keep) => {
                        mutations::operators::delete_other_sessions_sqlite(conn, operator_id, keep)?
                    }
                    None => {
                        mutations::operators::delete_sessions_for_operator_sqlite(conn, operator_id)?
                    }
                };
                conn.insert_audit_event(event)?;
                Ok(())
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                mutations::operators::update_password_mysql(conn, operator_id, new_password)?;
                match keep_session_id {
                    Some(keep) => {
                        mutations::operators::delete_other_sessions_mysql(conn, operator_id, keep)?
                    }
                    None => {
                        mutations::operators::delete_sessions_for_operator_mysql(conn, operator_id)?
                    }
                };
                conn.insert_audit_event(event)?;
                Ok(())
            }),
        }
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_session(
        &mut self,
        session_token: &str,
        operator_id: i64,
        expires_at: &str,
    ) -> Result<i64, PersistenceError> {
        dispatch!(
            self,
            mutations::operators, create_session(session_token, operator_id, expires_at)
        )
    }

    /// Retrieves a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_session_by_token(
        &mut self,
        session_token: &str,
    ) -> Result<Option<SessionData>, PersistenceError> {
        dispatch!(self, queries::operators, get_session_by_token(session_token))
    }

    /// Touches a session's last activity time.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_session_activity(&mut self, session_id: i64) -> Result<(), PersistenceError> {
        dispatch!(self, mutations::operators, update_session_activity(session_id))
    }

    /// Deletes a session by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_session(&mut self, session_token: &str) -> Result<(), PersistenceError> {
        dispatch!(self, mutations::operators, delete_session(session_token))
    }

    /// Deletes every expired session.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_expired_sessions(&mut self) -> Result<usize, PersistenceError> {
        dispatch!(self, mutations::operators, delete_expired_sessions())
    }

    /// Deletes all sessions of an operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_sessions_for_operator(
        &mut self,
        operator_id: i64,
    ) -> Result<usize, PersistenceError> {
        dispatch!(self, mutations::operators, delete_sessions_for_operator(operator_id))
    }

    // ========================================================================
    // Agencies
    // ========================================================================

    /// Creates an agency.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the code is taken.
    pub fn create_agency(
        &mut self,
        new: &NewAgency,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::agencies, create_agency(new))
    }

    /// Creates an agency together with its login in one transaction.
    ///
    /// The operator gets the `Agency` role and must change the temporary
    /// password at first login. If either insert fails neither row remains.
    /// Returns `(agency_id, operator_id)`.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the agency code or login name is taken.
    pub fn create_agency_with_operator(
        &mut self,
        new: &NewAgency,
        login: &NewOperator<'_>,
        event: &AuditEvent,
    ) -> Result<(i64, i64), PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                let agency_id = mutations::agencies::create_agency_sqlite(conn, new)?;
                let operator = agency_login(login, agency_id);
                let operator_id = mutations::operators::create_operator_sqlite(conn, &operator)?;
                conn.insert_audit_event(&event.clone().with_entity_id(agency_id))?;
                Ok((agency_id, operator_id))
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                let agency_id = mutations::agencies::create_agency_mysql(conn, new)?;
                let operator = agency_login(login, agency_id);
                let operator_id = mutations::operators::create_operator_mysql(conn, &operator)?;
                conn.insert_audit_event(&event.clone().with_entity_id(agency_id))?;
                Ok((agency_id, operator_id))
            }),
        }
    }

    /// Retrieves an agency by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_agency(&mut self, agency_id: i64) -> Result<Option<AgencyData>, PersistenceError> {
        dispatch!(self, queries::agencies, get_agency(agency_id))
    }

    /// Retrieves an agency by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_agency_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<AgencyData>, PersistenceError> {
        dispatch!(self, queries::agencies, find_agency_by_code(code))
    }

    /// Lists all agencies ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_agencies(&mut self) -> Result<Vec<AgencyData>, PersistenceError> {
        dispatch!(self, queries::agencies, list_agencies())
    }

    /// Returns every agency id mapped to its parent id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn agency_parent_map(&mut self) -> Result<HashMap<i64, Option<i64>>, PersistenceError> {
        dispatch!(self, queries::agencies, agency_parent_map())
    }

    /// Counts the records that still reference an agency.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn agency_references(
        &mut self,
        agency_id: i64,
    ) -> Result<AgencyReferences, PersistenceError> {
        dispatch!(self, queries::agencies, agency_references(agency_id))
    }

    /// Replaces an agency's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the agency does not exist.
    pub fn update_agency(
        &mut self,
        agency_id: i64,
        update: &AgencyUpdate,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        audited!(self, event, mutations::agencies, update_agency(agency_id, update))
    }

    /// Deletes an agency nothing references any more.
    ///
    /// Operator accounts of the agency are detached, disabled and logged out
    /// in the same transaction. Returns the ids of those operators.
    ///
    /// # Errors
    ///
    /// Returns `Referenced` if livers, child agencies, report rows, invoices,
    /// applications or refunds still point at the agency.
    pub fn delete_agency(
        &mut self,
        agency_id: i64,
        event: &AuditEvent,
    ) -> Result<Vec<i64>, PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                let refs = queries::agencies::agency_references_sqlite(conn, agency_id)?;
                let detached =
                    mutations::operators::detach_agency_operators_sqlite(conn, agency_id)?;
                mutations::agencies::delete_agency_sqlite(conn, agency_id, &refs)?;
                conn.insert_audit_event(event)?;
                Ok(detached)
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                let refs = queries::agencies::agency_references_mysql(conn, agency_id)?;
                let detached =
                    mutations::operators::detach_agency_operators_mysql(conn, agency_id)?;
                mutations::agencies::delete_agency_mysql(conn, agency_id, &refs)?;
                conn.insert_audit_event(event)?;
                Ok(detached)
            }),
        }
    }

    // ========================================================================
    // Livers
    // ========================================================================

    /// Adds a liver to the roster.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the TikTok user id is already present.
    pub fn create_liver(
        &mut self,
        new: &NewLiver,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::livers, create_liver(new))
    }

    /// Retrieves a liver by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_liver(&mut self, liver_id: i64) -> Result<Option<LiverData>, PersistenceError> {
        dispatch!(self, queries::livers, get_liver(liver_id))
    }

    /// Retrieves a liver by TikTok user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_liver_by_tiktok_user_id(
        &mut self,
        tiktok_user_id: &str,
    ) -> Result<Option<LiverData>, PersistenceError> {
        dispatch!(self, queries::livers, get_liver_by_tiktok_user_id(tiktok_user_id))
    }

    /// Finds a liver by handle, ignoring `@` and letter case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_liver_by_handle(
        &mut self,
        handle: &str,
    ) -> Result<Option<LiverData>, PersistenceError> {
        dispatch!(self, queries::livers, find_liver_by_handle(handle))
    }

    /// Lists livers matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_livers(&mut self, filter: &LiverFilter) -> Result<Vec<LiverData>, PersistenceError> {
        dispatch!(self, queries::livers, list_livers(filter))
    }

    /// Replaces a liver's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the liver does not exist.
    pub fn update_liver(
        &mut self,
        liver_id: i64,
        update: &LiverUpdate,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        audited!(self, event, mutations::livers, update_liver(liver_id, update))
    }

    /// Sets the status of several livers at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn bulk_update_liver_status(
        &mut self,
        liver_ids: &[i64],
        status: LiverStatus,
        event: &AuditEvent,
    ) -> Result<usize, PersistenceError> {
        audited!(
            self,
            event,
            mutations::livers, bulk_update_liver_status(liver_ids, status)
        )
    }

    // ========================================================================
    // Applications
    // ========================================================================

    /// Stores a new pending application.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_application(
        &mut self,
        new: &NewApplication,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::applications, create_application(new))
    }

    /// Retrieves an application by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_application(
        &mut self,
        application_id: i64,
    ) -> Result<Option<ApplicationData>, PersistenceError> {
        dispatch!(self, queries::applications, get_application(application_id))
    }

    /// Lists applications matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_applications(
        &mut self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationData>, PersistenceError> {
        dispatch!(self, queries::applications, list_applications(filter))
    }

    /// Applies a status transition guarded by the expected version and
    /// returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `StaleWrite` if the application changed since it was read.
    pub fn transition_application(
        &mut self,
        transition: &ApplicationTransition,
        event: &AuditEvent,
    ) -> Result<i32, PersistenceError> {
        audited!(
            self,
            event,
            mutations::applications, transition_application(transition, None)
        )
    }

    /// Creates a liver from an application and authorizes it in one
    /// transaction. Returns `(new_version, liver_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StaleWrite` if the application changed since it was read, or
    /// `UniqueViolation` if the liver already exists. Nothing is written in
    /// either case.
    pub fn authorize_application_with_liver(
        &mut self,
        transition: &ApplicationTransition,
        liver: &NewLiver,
        event: &AuditEvent,
    ) -> Result<(i32, i64), PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                let liver_id = mutations::livers::create_liver_sqlite(conn, liver)?;
                let version = mutations::applications::transition_application_sqlite(
                    conn,
                    transition,
                    Some(liver_id),
                )?;
                conn.insert_audit_event(event)?;
                Ok((version, liver_id))
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                let liver_id = mutations::livers::create_liver_mysql(conn, liver)?;
                let version = mutations::applications::transition_application_mysql(
                    conn,
                    transition,
                    Some(liver_id),
                )?;
                conn.insert_audit_event(event)?;
                Ok((version, liver_id))
            }),
        }
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Retrieves the report for a month.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_report_by_month(
        &mut self,
        data_month: DataMonth,
    ) -> Result<Option<ReportData>, PersistenceError> {
        dispatch!(self, queries::reports, find_report_by_month(data_month))
    }

    /// Retrieves a report by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_report(&mut self, report_id: i64) -> Result<Option<ReportData>, PersistenceError> {
        dispatch!(self, queries::reports, get_report(report_id))
    }

    /// Lists reports, most recent month first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_reports(&mut self) -> Result<Vec<ReportData>, PersistenceError> {
        dispatch!(self, queries::reports, list_reports())
    }

    /// Lists a report's rows, optionally restricted to some agencies.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_report_rows(
        &mut self,
        report_id: i64,
        agency_ids: Option<&[i64]>,
    ) -> Result<Vec<ReportRowData>, PersistenceError> {
        dispatch!(self, queries::reports, list_report_rows(report_id, agency_ids))
    }

    /// Stores a report and its rows in one transaction, optionally replacing
    /// the report that covers the same month.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateDataMonth` if the month exists and no replacement was
    /// requested, or `ReportHasInvoices` if the replaced report is invoiced.
    pub fn import_report(
        &mut self,
        new: &NewReport,
        rows: &[NewReportRow],
        replace: Option<i64>,
        event: &AuditEvent,
    ) -> Result<ImportOutcome, PersistenceError> {
        match &mut self.conn {
            BackendConnection::Sqlite(conn) => conn.transaction(|conn| {
                let outcome =
                    mutations::reports::import_report_sqlite(conn, new, rows, replace)?;
                conn.insert_audit_event(&event.clone().with_entity_id(outcome.report_id))?;
                Ok(outcome)
            }),
            BackendConnection::Mysql(conn) => conn.transaction(|conn| {
                let outcome = mutations::reports::import_report_mysql(conn, new, rows, replace)?;
                conn.insert_audit_event(&event.clone().with_entity_id(outcome.report_id))?;
                Ok(outcome)
            }),
        }
    }

    /// Changes a report's exchange rate and recomputes its rows and refunds.
    ///
    /// # Errors
    ///
    /// Returns `ReportHasInvoices` if invoices were issued for the report.
    pub fn recalculate_report(
        &mut self,
        report_id: i64,
        new_rate: ExchangeRate,
        changed_by: i64,
        event: &AuditEvent,
    ) -> Result<RecalculationSummary, PersistenceError> {
        audited!(
            self,
            event,
            mutations::reports, recalculate_report(report_id, new_rate, changed_by)
        )
    }

    /// Lists the exchange-rate history of a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_exchange_rate_logs(
        &mut self,
        report_id: i64,
    ) -> Result<Vec<ExchangeRateLogData>, PersistenceError> {
        dispatch!(self, queries::reports, list_exchange_rate_logs(report_id))
    }

    /// Counts invoices issued against a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_invoices_for_report(&mut self, report_id: i64) -> Result<i64, PersistenceError> {
        dispatch!(self, queries::reports, count_invoices_for_report(report_id))
    }

    /// Records a refund.
    ///
    /// # Errors
    ///
    /// Returns `ForeignKeyViolation` if a referenced record is missing.
    pub fn create_refund(
        &mut self,
        new: &NewRefund,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::reports, create_refund(new))
    }

    /// Retrieves a refund by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_refund(&mut self, refund_id: i64) -> Result<Option<RefundData>, PersistenceError> {
        dispatch!(self, queries::reports, get_refund(refund_id))
    }

    /// Lists the refunds of a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_refunds(&mut self, report_id: i64) -> Result<Vec<RefundData>, PersistenceError> {
        dispatch!(self, queries::reports, list_refunds(report_id))
    }

    /// Deletes a refund.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the refund does not exist.
    pub fn delete_refund(
        &mut self,
        refund_id: i64,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        audited!(self, event, mutations::reports, delete_refund(refund_id))
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Sums commission JPY per agency for a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn commission_totals_by_agency(
        &mut self,
        report_id: i64,
    ) -> Result<BTreeMap<i64, i64>, PersistenceError> {
        dispatch!(self, queries::invoices, commission_totals_by_agency(report_id))
    }

    /// Sums refund JPY per agency for a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn refund_totals_by_agency(
        &mut self,
        report_id: i64,
    ) -> Result<BTreeMap<i64, i64>, PersistenceError> {
        dispatch!(self, queries::invoices, refund_totals_by_agency(report_id))
    }

    /// Stores an invoice.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the agency already has an invoice for the
    /// report or the number is taken.
    pub fn insert_invoice(
        &mut self,
        new: &NewInvoice,
        event: &AuditEvent,
    ) -> Result<i64, PersistenceError> {
        audited!(link self, event, mutations::invoices, insert_invoice(new))
    }

    /// Retrieves an invoice by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_invoice(&mut self, invoice_id: i64) -> Result<Option<InvoiceData>, PersistenceError> {
        dispatch!(self, queries::invoices, get_invoice(invoice_id))
    }

    /// Retrieves the invoice of an agency for a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_invoice_for_agency_report(
        &mut self,
        agency_id: i64,
        report_id: i64,
    ) -> Result<Option<InvoiceData>, PersistenceError> {
        dispatch!(
            self,
            queries::invoices, find_invoice_for_agency_report(agency_id, report_id)
        )
    }

    /// Lists invoices matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_invoices(
        &mut self,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceData>, PersistenceError> {
        dispatch!(self, queries::invoices, list_invoices(filter))
    }

    /// Returns the invoice numbers already issued for a month.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn invoice_numbers_for_month(
        &mut self,
        month: DataMonth,
    ) -> Result<Vec<String>, PersistenceError> {
        dispatch!(self, queries::invoices, invoice_numbers_for_month(month))
    }

    /// Deletes an invoice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not exist.
    pub fn delete_invoice(
        &mut self,
        invoice_id: i64,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        audited!(self, event, mutations::invoices, delete_invoice(invoice_id))
    }
}

/// The login created alongside a new agency.
fn agency_login<'a>(login: &NewOperator<'a>, agency_id: i64) -> NewOperator<'a> {
    NewOperator {
        role: ROLE_AGENCY,
        agency_id: Some(agency_id),
        must_change_password: true,
        ..*login
    }
}
