// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit log queries.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_audit::{Action, Actor, AuditEvent, Cause};

use crate::data_models::AuditEventRecord;
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = audit_events)]
struct AuditEventRow {
    event_id: i64,
    actor_type: String,
    actor_id: String,
    actor_operator_id: Option<i64>,
    actor_login_name: Option<String>,
    actor_display_name: Option<String>,
    cause_id: String,
    cause_description: String,
    action_name: String,
    action_details: Option<String>,
    entity_type: String,
    entity_id: Option<i64>,
    created_at: String,
}

impl From<AuditEventRow> for AuditEventRecord {
    fn from(row: AuditEventRow) -> Self {
        let actor = Actor {
            id: row.actor_id,
            actor_type: row.actor_type,
            operator_id: row.actor_operator_id,
            login_name: row.actor_login_name,
            display_name: row.actor_display_name,
        };
        let event = AuditEvent::new(
            actor,
            Cause::new(row.cause_id, row.cause_description),
            Action::new(row.action_name, row.action_details),
            row.entity_type,
            row.entity_id,
        );

        Self {
            event_id: row.event_id,
            event,
            created_at: row.created_at,
        }
    }
}

backend_fn! {
/// Lists the most recent audit events, newest first.
///
/// `entity_type` restricts the listing to one kind of record.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_audit_events(
    conn: &mut _,
    entity_type: Option<&str>,
    limit: i64,
) -> Result<Vec<AuditEventRecord>, PersistenceError> {
    let mut query = audit_events::table.into_boxed();

    if let Some(entity_type) = entity_type {
        query = query.filter(audit_events::entity_type.eq(entity_type.to_string()));
    }

    let rows: Vec<AuditEventRow> = query
        .order(audit_events::event_id.desc())
        .limit(limit)
        .select(AuditEventRow::as_select())
        .load(conn)?;

    Ok(rows.into_iter().map(AuditEventRecord::from).collect())
}
}
