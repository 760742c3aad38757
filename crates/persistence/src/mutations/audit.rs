// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit event persistence.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use liverdesk_audit::AuditEvent;
use tracing::debug;

use crate::backend::PersistenceBackend;
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;
use crate::timestamp::now_timestamp;

backend_fn! {
/// Persists an audit event and returns its id.
///
/// Callers run this inside the transaction of the change it describes, so
/// the event and the change commit or roll back together.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_audit_event(conn: &mut _, event: &AuditEvent) -> Result<i64, PersistenceError> {
    let created_at: String = now_timestamp()?;

    diesel::insert_into(audit_events::table)
        .values((
            audit_events::actor_type.eq(&event.actor.actor_type),
            audit_events::actor_id.eq(&event.actor.id),
            audit_events::actor_operator_id.eq(event.actor.operator_id),
            audit_events::actor_login_name.eq(event.actor.login_name.as_deref()),
            audit_events::actor_display_name.eq(event.actor.display_name.as_deref()),
            audit_events::cause_id.eq(&event.cause.id),
            audit_events::cause_description.eq(&event.cause.description),
            audit_events::action_name.eq(&event.action.name),
            audit_events::action_details.eq(event.action.details.as_deref()),
            audit_events::entity_type.eq(&event.entity_type),
            audit_events::entity_id.eq(event.entity_id),
            audit_events::created_at.eq(&created_at),
        ))
        .execute(conn)?;

    let event_id: i64 = conn.get_last_insert_rowid()?;

    debug!(
        event_id,
        action = %event.action.name,
        entity_type = %event.entity_type,
        "Audit event persisted"
    );

    Ok(event_id)
}
}
