// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Capability computation for authorization-aware UI gating.
//!
//! Capabilities tell a client which actions to offer. They are advisory
//! only and do not replace the checks every handler performs.

use liverdesk_persistence::{OperatorData, Persistence, ROLE_ADMIN};

use crate::auth::{AuthenticatedActor, Role};
use crate::error::{ApiError, translate_persistence_error};
use crate::request_response::{Capabilities, Capability, OperatorCapabilities};

/// Computes the capabilities of the logged-in operator.
///
/// Disabled operators and operators that still have to replace a temporary
/// password get nothing but the flag telling them so.
#[must_use]
pub fn compute_capabilities(actor: &AuthenticatedActor, operator: &OperatorData) -> Capabilities {
    let usable: bool = !operator.is_disabled && !operator.must_change_password;
    let admin: Capability = Capability::from_bool(usable && actor.role == Role::Admin);

    Capabilities {
        can_manage_agencies: admin,
        can_manage_operators: admin,
        // Agency operators maintain the livers in their own subtree.
        can_manage_livers: Capability::from_bool(usable),
        can_import_reports: admin,
        can_issue_invoices: admin,
        can_review_applications: admin,
        can_view_audit_log: admin,
        must_change_password: operator.must_change_password,
    }
}

/// Computes what the caller may do to `target`.
///
/// The last active administrator can never be disabled.
///
/// # Errors
///
/// Returns an error if the administrator count cannot be read.
pub fn compute_operator_capabilities(
    actor: &AuthenticatedActor,
    actor_operator: &OperatorData,
    target: &OperatorData,
    persistence: &mut Persistence,
) -> Result<OperatorCapabilities, ApiError> {
    if actor_operator.is_disabled || actor.role != Role::Admin {
        return Ok(OperatorCapabilities {
            can_disable: Capability::Denied,
            can_enable: Capability::Denied,
        });
    }

    let is_last_active_admin: bool = if target.role == ROLE_ADMIN && !target.is_disabled {
        persistence
            .count_active_admin_operators()
            .map_err(|e| translate_persistence_error(e, "Operator"))?
            <= 1
    } else {
        false
    };

    let is_self: bool = target.operator_id == actor.operator_id;

    Ok(OperatorCapabilities {
        can_disable: Capability::from_bool(
            !target.is_disabled && !is_last_active_admin && !is_self,
        ),
        // Agency logins detached from a deleted agency stay disabled.
        can_enable: Capability::from_bool(
            target.is_disabled && (target.role == ROLE_ADMIN || target.agency_id.is_some()),
        ),
    })
}
