// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{
    ApplicationFormType, ApplicationStatus, LiverStatus, normalize_tiktok_handle,
    requires_liver_creation, validate_email,
};
use liverdesk_persistence::{
    ApplicationData, ApplicationFilter, ApplicationTransition, NewApplication, NewLiver,
    Persistence,
};
use serde_json::Value;
use tracing::info;

use crate::auth::{AgencyScope, AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::livers::build_new_liver;
use crate::handlers::{format_date, not_found, optional_text, today_in_japan};
use crate::request_response::{
    ApplicationInfo, ListApplicationsQuery, ListApplicationsResponse, LiverFields,
    SubmitApplicationRequest, TransitionApplicationRequest, TransitionApplicationResponse,
};

fn load_application(
    persistence: &mut Persistence,
    application_id: i64,
) -> Result<ApplicationData, ApiError> {
    persistence
        .get_application(application_id)
        .map_err(|e| translate_persistence_error(e, "Application"))?
        .ok_or_else(|| not_found("Application", application_id))
}

fn payload_text(payload: &Value, key: &str) -> Option<String> {
    optional_text(payload.get(key).and_then(Value::as_str))
}

/// Submits an application form.
///
/// Submissions by agency operators are always filed under their own
/// agency. A liver registration must carry a TikTok handle.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The form contents
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if the form type or any applicant field is invalid, or
/// the named agency does not exist.
#[allow(clippy::too_many_lines)]
pub fn submit_application(
    persistence: &mut Persistence,
    request: &SubmitApplicationRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<ApplicationInfo, ApiError> {
    let form_type: ApplicationFormType = request
        .form_type
        .trim()
        .parse()
        .map_err(translate_domain_error)?;

    let applicant_name: String =
        optional_text(Some(&request.applicant_name)).ok_or_else(|| ApiError::InvalidInput {
            field: String::from("applicant_name"),
            message: String::from("Applicant name cannot be empty"),
        })?;

    let applicant_email: Option<String> = optional_text(request.applicant_email.as_deref());
    if let Some(address) = &applicant_email {
        validate_email(address).map_err(translate_domain_error)?;
    }

    let tiktok_handle: Option<String> = match optional_text(request.tiktok_handle.as_deref()) {
        Some(handle) => Some(normalize_tiktok_handle(&handle).map_err(translate_domain_error)?),
        None => None,
    };
    if requires_liver_creation(form_type) && tiktok_handle.is_none() {
        return Err(ApiError::InvalidInput {
            field: String::from("tiktok_handle"),
            message: format!("A {} application needs a TikTok handle", form_type.as_str()),
        });
    }

    let tiktok_user_id: Option<String> = optional_text(request.tiktok_user_id.as_deref());
    if let Some(id) = tiktok_user_id
        .as_deref()
        .filter(|id| !id.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(ApiError::InvalidInput {
            field: String::from("tiktok_user_id"),
            message: format!("'{id}' must contain digits only"),
        });
    }

    let agency_id: Option<i64> = if authenticated_actor.is_admin() {
        request.agency_id
    } else {
        authenticated_actor.agency_id
    };
    if let Some(id) = agency_id {
        persistence
            .get_agency(id)
            .map_err(|e| translate_persistence_error(e, "Agency"))?
            .ok_or_else(|| ApiError::InvalidInput {
                field: String::from("agency_id"),
                message: format!("Agency {id} does not exist"),
            })?;
    }

    let payload: Value = match &request.payload {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };

    let new_application = NewApplication {
        form_type,
        applicant_name,
        applicant_email,
        tiktok_handle,
        tiktok_user_id,
        agency_id,
        payload,
        submitted_by: Some(authenticated_actor.operator_id),
    };
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "SubmitApplication",
        Some(format!(
            "Submitted {} application for {}",
            form_type.as_str(),
            new_application.applicant_name
        )),
        "application",
        None,
    );
    let application_id: i64 = persistence
        .create_application(&new_application, &event)
        .map_err(|e| translate_persistence_error(e, "Application"))?;

    info!(application_id, form_type = form_type.as_str(), "Application submitted");
    Ok(ApplicationInfo::from(load_application(persistence, application_id)?))
}

/// Lists the applications visible to the caller.
///
/// # Errors
///
/// Returns an error if a filter value is invalid.
pub fn list_applications(
    persistence: &mut Persistence,
    query: &ListApplicationsQuery,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListApplicationsResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;

    let form_type: Option<ApplicationFormType> = match optional_text(query.form_type.as_deref()) {
        Some(text) => Some(text.parse().map_err(translate_domain_error)?),
        None => None,
    };
    let status: Option<ApplicationStatus> = match optional_text(query.status.as_deref()) {
        Some(text) => Some(text.parse().map_err(translate_domain_error)?),
        None => None,
    };

    let applications: Vec<ApplicationInfo> = persistence
        .list_applications(&ApplicationFilter {
            form_type,
            status,
            agency_ids: scope.as_filter(),
        })
        .map_err(|e| translate_persistence_error(e, "Application"))?
        .into_iter()
        .map(ApplicationInfo::from)
        .collect();

    Ok(ListApplicationsResponse { applications })
}

/// Returns one application.
///
/// # Errors
///
/// Returns an error if the application does not exist or is outside the
/// caller's subtree.
pub fn get_application(
    persistence: &mut Persistence,
    application_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ApplicationInfo, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let application: ApplicationData = load_application(persistence, application_id)?;
    AuthorizationService::authorize_agency_scope(
        authenticated_actor,
        application.agency_id,
        &scope,
        "get_application",
    )?;
    Ok(ApplicationInfo::from(application))
}

/// Builds the liver a liver registration creates when it is authorized.
fn liver_from_application(application: &ApplicationData) -> Result<NewLiver, ApiError> {
    let tiktok_handle: String =
        application
            .tiktok_handle
            .clone()
            .ok_or_else(|| ApiError::DomainRuleViolation {
                rule: String::from("application_lifecycle"),
                message: format!(
                    "Application {} has no TikTok handle to register",
                    application.application_id
                ),
            })?;

    let fields = LiverFields {
        tiktok_handle,
        display_name: payload_text(&application.payload, "display_name")
            .unwrap_or_else(|| application.applicant_name.clone()),
        tiktok_user_id: application.tiktok_user_id.clone(),
        real_name: payload_text(&application.payload, "real_name"),
        email: application.applicant_email.clone(),
        status: None,
        agency_id: application.agency_id,
        joined_at: Some(format_date(today_in_japan()?)?),
        notes: Some(format!(
            "Registered from application {}",
            application.application_id
        )),
    };
    build_new_liver(&fields, application.agency_id, LiverStatus::Active)
}

/// Moves an application to a new status.
///
/// The caller passes the version they read; if the application changed
/// since, the transition is refused with a conflict. Authorizing a liver
/// registration creates the liver in the same transaction.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `application_id` - The application to move
/// * `request` - The expected version, target status and review note
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The application does not exist
/// - The transition is not part of the lifecycle
/// - The application was modified since `expected_version`
/// - The liver to create collides with an existing one
pub fn transition_application(
    persistence: &mut Persistence,
    application_id: i64,
    request: &TransitionApplicationRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<TransitionApplicationResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "transition_application")?;

    let application: ApplicationData = load_application(persistence, application_id)?;
    let to: ApplicationStatus = request.to.trim().parse().map_err(translate_domain_error)?;
    application
        .status
        .validate_transition(to)
        .map_err(translate_domain_error)?;

    let transition = ApplicationTransition {
        application_id,
        expected_version: request.expected_version,
        from: application.status,
        to,
        reviewer_operator_id: authenticated_actor.operator_id,
        review_note: optional_text(request.note.as_deref()),
    };
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "TransitionApplication",
        Some(format!(
            "Moved {} application from {} to {}",
            application.form_type.as_str(),
            application.status,
            to
        )),
        "application",
        Some(application_id),
    );

    let created_liver_id: Option<i64> =
        if to == ApplicationStatus::Authorized && requires_liver_creation(application.form_type) {
            let liver: NewLiver = liver_from_application(&application)?;
            let (_, liver_id) = persistence
                .authorize_application_with_liver(&transition, &liver, &event)
                .map_err(|e| translate_persistence_error(e, "Application"))?;
            info!(application_id, liver_id, "Liver registered from application");
            Some(liver_id)
        } else {
            persistence
                .transition_application(&transition, &event)
                .map_err(|e| translate_persistence_error(e, "Application"))?;
            None
        };

    info!(application_id, to = to.as_str(), "Application transitioned");
    Ok(TransitionApplicationResponse {
        application: ApplicationInfo::from(load_application(persistence, application_id)?),
        created_liver_id,
    })
}
