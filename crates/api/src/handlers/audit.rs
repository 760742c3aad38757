// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_persistence::Persistence;

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_persistence_error};
use crate::handlers::optional_text;
use crate::request_response::{AuditEventInfo, ListAuditEventsQuery, ListAuditEventsResponse};

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 1000;

/// Lists recent audit events, newest first.
///
/// # Errors
///
/// Returns an error if the actor is not an admin.
pub fn list_audit_events(
    persistence: &mut Persistence,
    query: &ListAuditEventsQuery,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListAuditEventsResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "list_audit_events")?;

    let limit: i64 = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entity_type: Option<String> = optional_text(query.entity_type.as_deref());

    let events: Vec<AuditEventInfo> = persistence
        .list_audit_events(entity_type.as_deref(), limit)
        .map_err(|e| translate_persistence_error(e, "AuditEvent"))?
        .into_iter()
        .map(AuditEventInfo::from)
        .collect();

    Ok(ListAuditEventsResponse { events })
}
