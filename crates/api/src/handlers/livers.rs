// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{LiverStatus, validate_email, validate_liver_fields};
use liverdesk_persistence::{LiverData, LiverFilter, LiverUpdate, NewLiver, Persistence};
use tracing::info;

use crate::auth::{AgencyScope, AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::{format_date, not_found, optional_text, parse_date};
use crate::request_response::{
    BulkLiverStatusRequest, BulkLiverStatusResponse, ListLiversQuery, ListLiversResponse,
    LiverFields, LiverInfo,
};

fn load_liver(persistence: &mut Persistence, liver_id: i64) -> Result<LiverData, ApiError> {
    persistence
        .get_liver(liver_id)
        .map_err(|e| translate_persistence_error(e, "Liver"))?
        .ok_or_else(|| not_found("Liver", liver_id))
}

fn parse_status(value: &str) -> Result<LiverStatus, ApiError> {
    value.trim().parse().map_err(translate_domain_error)
}

/// Validates liver fields, using `default_status` when none is given.
pub(crate) fn build_new_liver(
    fields: &LiverFields,
    agency_id: Option<i64>,
    default_status: LiverStatus,
) -> Result<NewLiver, ApiError> {
    let validated = validate_liver_fields(
        &fields.display_name,
        &fields.tiktok_handle,
        fields.tiktok_user_id.as_deref(),
    )
    .map_err(translate_domain_error)?;

    let email: Option<String> = optional_text(fields.email.as_deref());
    if let Some(address) = &email {
        validate_email(address).map_err(translate_domain_error)?;
    }

    let status: LiverStatus = match optional_text(fields.status.as_deref()) {
        Some(text) => parse_status(&text)?,
        None => default_status,
    };

    let joined_at: Option<String> = match optional_text(fields.joined_at.as_deref()) {
        Some(text) => Some(format_date(parse_date("joined_at", &text)?)?),
        None => None,
    };

    Ok(NewLiver {
        tiktok_user_id: validated.tiktok_user_id,
        tiktok_handle: validated.tiktok_handle,
        display_name: validated.display_name,
        real_name: optional_text(fields.real_name.as_deref()),
        email,
        status,
        agency_id,
        joined_at,
        notes: optional_text(fields.notes.as_deref()),
    })
}

/// Checks that the agency exists and that the caller may assign to it.
fn check_agency_assignment(
    persistence: &mut Persistence,
    authenticated_actor: &AuthenticatedActor,
    scope: &AgencyScope,
    agency_id: Option<i64>,
    action: &str,
) -> Result<(), ApiError> {
    AuthorizationService::authorize_agency_scope(authenticated_actor, agency_id, scope, action)?;
    if let Some(id) = agency_id {
        persistence
            .get_agency(id)
            .map_err(|e| translate_persistence_error(e, "Agency"))?
            .ok_or_else(|| ApiError::InvalidInput {
                field: String::from("agency_id"),
                message: format!("Agency {id} does not exist"),
            })?;
    }
    Ok(())
}

/// Adds a liver to the roster.
///
/// Agency operators create livers in their own agency unless they name
/// another agency in their subtree.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The liver fields
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - Any field is invalid
/// - The agency is outside the caller's subtree or does not exist
/// - The handle or user id is already registered
pub fn create_liver(
    persistence: &mut Persistence,
    request: &LiverFields,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<LiverInfo, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let agency_id: Option<i64> = if authenticated_actor.is_admin() {
        request.agency_id
    } else {
        request.agency_id.or(authenticated_actor.agency_id)
    };
    check_agency_assignment(persistence, authenticated_actor, &scope, agency_id, "create_liver")?;

    let new_liver: NewLiver = build_new_liver(request, agency_id, LiverStatus::Active)?;
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "CreateLiver",
        Some(format!("Registered liver @{}", new_liver.tiktok_handle)),
        "liver",
        None,
    );
    let liver_id: i64 = persistence
        .create_liver(&new_liver, &event)
        .map_err(|e| translate_persistence_error(e, "Liver"))?;

    info!(liver_id, agency_id = ?agency_id, "Liver created");
    Ok(LiverInfo::from(load_liver(persistence, liver_id)?))
}

/// Replaces a liver's fields.
///
/// Agency operators may only edit livers in their subtree and may not move
/// them outside it. When they omit the agency the current one is kept.
///
/// # Errors
///
/// Returns an error if the liver does not exist, either the current or the
/// new agency is outside the caller's subtree, or any field is invalid.
pub fn update_liver(
    persistence: &mut Persistence,
    liver_id: i64,
    request: &LiverFields,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<LiverInfo, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let existing: LiverData = load_liver(persistence, liver_id)?;
    AuthorizationService::authorize_agency_scope(
        authenticated_actor,
        existing.agency_id,
        &scope,
        "update_liver",
    )?;

    let agency_id: Option<i64> = if authenticated_actor.is_admin() {
        request.agency_id
    } else {
        request.agency_id.or(existing.agency_id)
    };
    check_agency_assignment(persistence, authenticated_actor, &scope, agency_id, "update_liver")?;

    let update: LiverUpdate = build_new_liver(request, agency_id, existing.status)?;
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "UpdateLiver",
        Some(format!("Updated liver @{}", update.tiktok_handle)),
        "liver",
        Some(liver_id),
    );
    persistence
        .update_liver(liver_id, &update, &event)
        .map_err(|e| translate_persistence_error(e, "Liver"))?;

    info!(liver_id, "Liver updated");
    Ok(LiverInfo::from(load_liver(persistence, liver_id)?))
}

/// Lists the livers visible to the caller.
///
/// # Errors
///
/// Returns an error if the status filter is invalid or the requested agency
/// is outside the caller's subtree.
pub fn list_livers(
    persistence: &mut Persistence,
    query: &ListLiversQuery,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListLiversResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;

    let agency_ids: Option<Vec<i64>> = match query.agency_id {
        Some(agency_id) => {
            AuthorizationService::authorize_agency_scope(
                authenticated_actor,
                Some(agency_id),
                &scope,
                "list_livers",
            )?;
            Some(vec![agency_id])
        }
        None => scope.as_filter(),
    };
    let status: Option<LiverStatus> = match optional_text(query.status.as_deref()) {
        Some(text) => Some(parse_status(&text)?),
        None => None,
    };

    let livers: Vec<LiverInfo> = persistence
        .list_livers(&LiverFilter { agency_ids, status })
        .map_err(|e| translate_persistence_error(e, "Liver"))?
        .into_iter()
        .map(LiverInfo::from)
        .collect();

    Ok(ListLiversResponse { livers })
}

/// Sets the status of several livers at once.
///
/// Every listed liver must exist and be visible to the caller; otherwise
/// nothing is changed.
///
/// # Errors
///
/// Returns an error if the list is empty, the status is invalid, or any
/// liver is missing or outside the caller's subtree.
pub fn bulk_update_liver_status(
    persistence: &mut Persistence,
    request: &BulkLiverStatusRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<BulkLiverStatusResponse, ApiError> {
    if request.liver_ids.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("liver_ids"),
            message: String::from("At least one liver is required"),
        });
    }
    let status: LiverStatus = parse_status(&request.status)?;
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;

    let mut liver_ids: Vec<i64> = request.liver_ids.clone();
    liver_ids.sort_unstable();
    liver_ids.dedup();
    for &liver_id in &liver_ids {
        let liver: LiverData = load_liver(persistence, liver_id)?;
        AuthorizationService::authorize_agency_scope(
            authenticated_actor,
            liver.agency_id,
            &scope,
            "bulk_update_liver_status",
        )?;
    }

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "BulkUpdateLiverStatus",
        Some(format!(
            "Set {} livers to {}",
            liver_ids.len(),
            status.as_str()
        )),
        "liver",
        None,
    );
    let updated: usize = persistence
        .bulk_update_liver_status(&liver_ids, status, &event)
        .map_err(|e| translate_persistence_error(e, "Liver"))?;

    info!(updated, status = status.as_str(), "Liver statuses updated");
    Ok(BulkLiverStatusResponse { updated })
}
