// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Database backend-specific code.
//!
//! Connection setup, migrations and the few helpers that cannot be written in
//! backend-agnostic Diesel DSL live here. Everything else belongs in
//! `queries/` and `mutations/`.

pub mod mysql;
pub mod sqlite;

use diesel::{Connection, MysqlConnection, SqliteConnection};
use liverdesk_audit::AuditEvent;

use crate::error::PersistenceError;
use crate::mutations::audit::{insert_audit_event_mysql, insert_audit_event_sqlite};

/// Operations that backend-agnostic bodies need but cannot express directly.
///
/// Implemented for both connection types so that code generated by
/// `backend_fn!` can call these as methods on `conn`.
pub trait PersistenceBackend: Connection {
    /// Retrieves the id of the row inserted last on this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError>;

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError>;

    /// Stores an audit event, usually inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn insert_audit_event(&mut self, event: &AuditEvent) -> Result<i64, PersistenceError>;
}

impl PersistenceBackend for SqliteConnection {
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError> {
        sqlite::get_last_insert_rowid(self)
    }

    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        sqlite::verify_foreign_key_enforcement(self)
    }

    fn insert_audit_event(&mut self, event: &AuditEvent) -> Result<i64, PersistenceError> {
        insert_audit_event_sqlite(self, event)
    }
}

impl PersistenceBackend for MysqlConnection {
    fn get_last_insert_rowid(&mut self) -> Result<i64, PersistenceError> {
        mysql::get_last_insert_rowid(self)
    }

    fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        mysql::verify_foreign_key_enforcement(self)
    }

    fn insert_audit_event(&mut self, event: &AuditEvent) -> Result<i64, PersistenceError> {
        insert_audit_event_mysql(self, event)
    }
}
