// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{
    AgencyRank, InvoiceRegistrationNumber, validate_agency_fields, validate_bank_account,
    validate_parent_assignment,
};
use liverdesk_persistence::{
    AgencyData, AgencyUpdate, BankDetails, NewAgency, NewOperator, Persistence, ROLE_AGENCY,
};
use tracing::info;

use crate::auth::{AgencyScope, AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::{not_found, optional_text};
use crate::password_policy::generate_temporary_password;
use crate::request_response::{
    AgencyFields, AgencyInfo, CreateAgencyRequest, CreateAgencyResponse, DeleteAgencyResponse,
    ListAgenciesResponse, ProvisionedLogin,
};

/// Id used for an agency that does not exist yet when checking its parent.
const UNSAVED_AGENCY_ID: i64 = 0;

fn load_agency(persistence: &mut Persistence, agency_id: i64) -> Result<AgencyData, ApiError> {
    persistence
        .get_agency(agency_id)
        .map_err(|e| translate_persistence_error(e, "Agency"))?
        .ok_or_else(|| not_found("Agency", agency_id))
}

fn normalize_bank(bank: &BankDetails) -> Result<BankDetails, ApiError> {
    let bank_account_number: Option<String> =
        optional_text(bank.bank_account_number.as_deref());
    if let Some(number) = &bank_account_number {
        validate_bank_account(number).map_err(translate_domain_error)?;
    }

    Ok(BankDetails {
        bank_name: optional_text(bank.bank_name.as_deref()),
        bank_branch: optional_text(bank.bank_branch.as_deref()),
        bank_account_type: optional_text(bank.bank_account_type.as_deref()),
        bank_account_number,
        bank_account_holder: optional_text(bank.bank_account_holder.as_deref()),
    })
}

/// Validates and normalises agency fields from a request.
fn build_new_agency(fields: &AgencyFields) -> Result<NewAgency, ApiError> {
    let validated = validate_agency_fields(
        &fields.name,
        &fields.code,
        &fields.commission_rate,
        fields.contact_email.as_deref(),
    )
    .map_err(translate_domain_error)?;

    let rank: AgencyRank = fields
        .rank
        .trim()
        .parse()
        .map_err(translate_domain_error)?;

    let invoice_registration_number: Option<String> =
        match optional_text(fields.invoice_registration_number.as_deref()) {
            Some(text) => Some(
                InvoiceRegistrationNumber::parse(&text)
                    .map_err(translate_domain_error)?
                    .as_str()
                    .to_string(),
            ),
            None => None,
        };

    Ok(NewAgency {
        name: validated.name,
        code: validated.code,
        commission_rate: validated.commission_rate,
        rank,
        parent_agency_id: fields.parent_agency_id,
        contact_email: validated.contact_email,
        bank: normalize_bank(&fields.bank)?,
        invoice_registration_number,
    })
}

/// Checks that the parent exists and the hierarchy stays acyclic.
fn check_parent(
    persistence: &mut Persistence,
    agency_id: i64,
    parent_agency_id: Option<i64>,
) -> Result<(), ApiError> {
    let Some(parent_id) = parent_agency_id else {
        return Ok(());
    };
    load_agency(persistence, parent_id).map_err(|_| ApiError::InvalidInput {
        field: String::from("parent_agency_id"),
        message: format!("Parent agency {parent_id} does not exist"),
    })?;

    let parents: HashMap<i64, Option<i64>> = persistence
        .agency_parent_map()
        .map_err(|e| translate_persistence_error(e, "Agency"))?;
    validate_parent_assignment(agency_id, Some(parent_id), &parents)
        .map_err(translate_domain_error)
}

fn check_code_available(
    persistence: &mut Persistence,
    code: &str,
    agency_id: Option<i64>,
) -> Result<(), ApiError> {
    let existing: Option<AgencyData> = persistence
        .find_agency_by_code(code)
        .map_err(|e| translate_persistence_error(e, "Agency"))?;
    match existing {
        Some(other) if Some(other.agency_id) != agency_id => Err(ApiError::Conflict {
            resource_type: String::from("Agency"),
            message: format!("Agency code {code} is already used by agency {}", other.agency_id),
        }),
        _ => Ok(()),
    }
}

/// Creates an agency, optionally with its own login.
///
/// When a login is requested it is created in the same transaction with a
/// generated temporary password, which is returned exactly once and must
/// be changed at first login.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The agency fields and optional login
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - Any field is invalid
/// - The parent does not exist or the hierarchy would be too deep
/// - The code or login name is already taken
#[allow(clippy::too_many_lines)]
pub fn create_agency(
    persistence: &mut Persistence,
    request: &CreateAgencyRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<CreateAgencyResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "create_agency")?;

    let new_agency: NewAgency = build_new_agency(&request.agency)?;
    check_parent(persistence, UNSAVED_AGENCY_ID, new_agency.parent_agency_id)?;
    check_code_available(persistence, &new_agency.code, None)?;

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "CreateAgency",
        Some(format!("Created agency {} ({})", new_agency.name, new_agency.code)),
        "agency",
        None,
    );

    let (agency_id, login) = match &request.login {
        None => {
            let agency_id: i64 = persistence
                .create_agency(&new_agency, &event)
                .map_err(|e| translate_persistence_error(e, "Agency"))?;
            (agency_id, None)
        }
        Some(login) => {
            let login_name: &str = login.login_name.trim();
            let display_name: &str = login.display_name.trim();
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

            let temporary_password: String = generate_temporary_password();
            let (agency_id, operator_id) = persistence
                .create_agency_with_operator(
                    &new_agency,
                    &NewOperator {
                        login_name,
                        display_name,
                        password: &temporary_password,
                        role: ROLE_AGENCY,
                        agency_id: None,
                        must_change_password: true,
                    },
                    &event,
                )
                .map_err(|e| translate_persistence_error(e, "Agency"))?;
            info!(agency_id, operator_id, "Provisioned agency login");
            (
                agency_id,
                Some(ProvisionedLogin {
                    operator_id,
                    login_name: login_name.to_string(),
                    temporary_password,
                }),
            )
        }
    };

    let agency: AgencyData = load_agency(persistence, agency_id)?;
    info!(agency_id, code = %agency.code, "Agency created");

    Ok(CreateAgencyResponse {
        agency: AgencyInfo::from(agency),
        login,
    })
}

/// Replaces an agency's fields.
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The agency does not exist or any field is invalid
/// - The new parent would make the hierarchy circular or too deep
/// - The code is used by another agency
pub fn update_agency(
    persistence: &mut Persistence,
    agency_id: i64,
    request: &AgencyFields,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<AgencyInfo, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "update_agency")?;

    load_agency(persistence, agency_id)?;
    let update: AgencyUpdate = build_new_agency(request)?;
    check_parent(persistence, agency_id, update.parent_agency_id)?;
    check_code_available(persistence, &update.code, Some(agency_id))?;

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "UpdateAgency",
        Some(format!("Updated agency {} ({})", update.name, update.code)),
        "agency",
        Some(agency_id),
    );
    persistence
        .update_agency(agency_id, &update, &event)
        .map_err(|e| translate_persistence_error(e, "Agency"))?;

    info!(agency_id, "Agency updated");
    Ok(AgencyInfo::from(load_agency(persistence, agency_id)?))
}

/// Lists the agencies visible to the caller.
///
/// # Errors
///
/// Returns an error if the agencies cannot be loaded.
pub fn list_agencies(
    persistence: &mut Persistence,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListAgenciesResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let agencies: Vec<AgencyInfo> = persistence
        .list_agencies()
        .map_err(|e| translate_persistence_error(e, "Agency"))?
        .into_iter()
        .filter(|agency| scope.contains(Some(agency.agency_id)))
        .map(AgencyInfo::from)
        .collect();

    Ok(ListAgenciesResponse { agencies })
}

/// Returns one agency.
///
/// # Errors
///
/// Returns an error if the agency does not exist or is outside the caller's
/// subtree.
pub fn get_agency(
    persistence: &mut Persistence,
    agency_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<AgencyInfo, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    AuthorizationService::authorize_agency_scope(
        authenticated_actor,
        Some(agency_id),
        &scope,
        "get_agency",
    )?;
    Ok(AgencyInfo::from(load_agency(persistence, agency_id)?))
}

/// Deletes an agency.
///
/// The agency's logins are detached, disabled and logged out. Agencies
/// that still have children, livers, report rows or invoices cannot be
/// deleted.
///
/// # Errors
///
/// Returns an error if the actor is not an admin, the agency does not
/// exist, or it is still referenced.
pub fn delete_agency(
    persistence: &mut Persistence,
    agency_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<DeleteAgencyResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "delete_agency")?;

    let agency: AgencyData = load_agency(persistence, agency_id)?;
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "DeleteAgency",
        Some(format!("Deleted agency {} ({})", agency.name, agency.code)),
        "agency",
        Some(agency_id),
    );
    let detached_operator_ids: Vec<i64> = persistence
        .delete_agency(agency_id, &event)
        .map_err(|e| translate_persistence_error(e, "Agency"))?;

    info!(
        agency_id,
        detached = detached_operator_ids.len(),
        "Agency deleted"
    );
    Ok(DeleteAgencyResponse {
        agency_id,
        message: format!("Agency {} deleted", agency.code),
        detached_operator_ids,
    })
}
