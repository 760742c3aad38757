// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_persistence::{NewOperator, OperatorData, Persistence, ROLE_ADMIN, ROLE_AGENCY};
use tracing::info;

use crate::auth::{AuthenticatedActor, AuthorizationService, Role};
use crate::capabilities::compute_operator_capabilities;
use crate::error::{ApiError, translate_persistence_error};
use crate::handlers::not_found;
use crate::password_policy::PasswordPolicy;
use crate::request_response::{
    CreateOperatorRequest, CreateOperatorResponse, ListOperatorsResponse, MessageResponse,
    OperatorInfo, OperatorListEntry,
};

fn load_operator(persistence: &mut Persistence, operator_id: i64) -> Result<OperatorData, ApiError> {
    persistence
        .get_operator_by_id(operator_id)
        .map_err(|e| translate_persistence_error(e, "Operator"))?
        .ok_or_else(|| not_found("Operator", operator_id))
}

/// Creates an operator.
///
/// `Agency` operators must name an existing agency; `Admin` operators must
/// not name one.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The new operator
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The role is unknown or the agency link does not fit the role
/// - The password violates the policy
/// - The login name is taken
pub fn create_operator(
    persistence: &mut Persistence,
    request: &CreateOperatorRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<CreateOperatorResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "create_operator")?;

    let role: Role = Role::from_stored(&request.role).ok_or_else(|| ApiError::InvalidInput {
        field: String::from("role"),
        message: format!(
            "Invalid role: {}. Must be '{ROLE_ADMIN}' or '{ROLE_AGENCY}'",
            request.role
        ),
    })?;

    match (role, request.agency_id) {
        (Role::Admin, Some(_)) => {
            return Err(ApiError::InvalidInput {
                field: String::from("agency_id"),
                message: String::from("Admin operators cannot belong to an agency"),
            });
        }
        (Role::Agency, None) => {
            return Err(ApiError::InvalidInput {
                field: String::from("agency_id"),
                message: String::from("Agency operators must belong to an agency"),
            });
        }
        (Role::Agency, Some(agency_id)) => {
            persistence
                .get_agency(agency_id)
                .map_err(|e| translate_persistence_error(e, "Agency"))?
                .ok_or_else(|| not_found("Agency", agency_id))?;
        }
        (Role::Admin, None) => {}
    }

    let login_name: &str = request.login_name.trim();
    let display_name: &str = request.display_name.trim();
    if login_name.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("login_name"),
            message: String::from("Login name cannot be empty"),
        });
    }
    if display_name.is_empty() {
        return Err(ApiError::InvalidInput {
            field: String::from("display_name"),
            message: String::from("Display name cannot be empty"),
        });
    }

    PasswordPolicy::default().validate(
        &request.password,
        &request.password_confirmation,
        login_name,
        display_name,
    )?;

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "CreateOperator",
        Some(format!(
            "Created operator {login_name} with role {}",
            role.as_str()
        )),
        "operator",
        None,
    );

    let operator_id: i64 = persistence
        .create_operator(
            &NewOperator {
                login_name,
                display_name,
                password: &request.password,
                role: role.as_str(),
                agency_id: request.agency_id,
                must_change_password: false,
            },
            &event,
        )
        .map_err(|e| translate_persistence_error(e, "Operator"))?;

    let operator: OperatorData = load_operator(persistence, operator_id)?;
    info!(operator_id, role = role.as_str(), "Operator created");

    Ok(CreateOperatorResponse {
        operator: OperatorInfo::from(&operator),
        message: format!("Operator {login_name} created"),
    })
}

/// Lists every operator with what the caller may do to each.
///
/// # Errors
///
/// Returns an error if the actor is not an admin.
pub fn list_operators(
    persistence: &mut Persistence,
    authenticated_actor: &AuthenticatedActor,
    operator: &OperatorData,
) -> Result<ListOperatorsResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "list_operators")?;

    let operators: Vec<OperatorData> = persistence
        .list_operators()
        .map_err(|e| translate_persistence_error(e, "Operator"))?;

    let mut entries: Vec<OperatorListEntry> = Vec::with_capacity(operators.len());
    for target in &operators {
        let capabilities =
            compute_operator_capabilities(authenticated_actor, operator, target, persistence)?;
        entries.push(OperatorListEntry {
            operator: OperatorInfo::from(target),
            capabilities,
        });
    }

    Ok(ListOperatorsResponse { operators: entries })
}

/// Disables an operator and revokes their sessions.
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The target is the caller or the last active administrator
/// - The target is already disabled
pub fn disable_operator(
    persistence: &mut Persistence,
    operator_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<MessageResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "disable_operator")?;

    if operator_id == authenticated_actor.operator_id {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("cannot_disable_self"),
            message: String::from("Operators cannot disable their own account"),
        });
    }

    let target: OperatorData = load_operator(persistence, operator_id)?;
    if target.is_disabled {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("operator_already_disabled"),
            message: format!("Operator {} is already disabled", target.login_name),
        });
    }

    if target.role == ROLE_ADMIN {
        let active_admins: i64 = persistence
            .count_active_admin_operators()
            .map_err(|e| translate_persistence_error(e, "Operator"))?;
        if active_admins <= 1 {
            return Err(ApiError::DomainRuleViolation {
                rule: String::from("last_active_admin"),
                message: String::from("Cannot disable the last active administrator"),
            });
        }
    }

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "DisableOperator",
        Some(format!("Disabled operator {}", target.login_name)),
        "operator",
        Some(operator_id),
    );
    persistence
        .disable_operator(operator_id, &event)
        .map_err(|e| translate_persistence_error(e, "Operator"))?;

    info!(operator_id, "Operator disabled");
    Ok(MessageResponse {
        message: format!("Operator {} disabled", target.login_name),
    })
}

/// Re-enables a disabled operator.
///
/// Agency logins whose agency was deleted have no agency to return to and
/// stay disabled.
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The target is not disabled
/// - The target is an agency login without an agency
pub fn enable_operator(
    persistence: &mut Persistence,
    operator_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<MessageResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "enable_operator")?;

    let target: OperatorData = load_operator(persistence, operator_id)?;
    if !target.is_disabled {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("operator_not_disabled"),
            message: format!("Operator {} is not disabled", target.login_name),
        });
    }
    if target.role == ROLE_AGENCY && target.agency_id.is_none() {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("detached_agency_login"),
            message: format!(
                "Operator {} no longer belongs to an agency and cannot be enabled",
                target.login_name
            ),
        });
    }

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "EnableOperator",
        Some(format!("Enabled operator {}", target.login_name)),
        "operator",
        Some(operator_id),
    );
    persistence
        .enable_operator(operator_id, &event)
        .map_err(|e| translate_persistence_error(e, "Operator"))?;

    info!(operator_id, "Operator enabled");
    Ok(MessageResponse {
        message: format!("Operator {} enabled", target.login_name),
    })
}
