// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Authentication and authorization types and services.

use std::collections::{BTreeSet, HashMap};

use liverdesk_audit::{Action, Actor, AuditEvent, Cause};
use liverdesk_domain::subtree;
use liverdesk_persistence::{
    OperatorData, Persistence, PersistenceError, ROLE_ADMIN, ROLE_AGENCY, SessionData,
    format_timestamp, parse_timestamp,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::error::{ApiError, AuthError, translate_persistence_error};
use crate::password_policy::{PasswordPolicy, PasswordPolicyError};

/// Operator roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Back-office staff with access to every agency, report and invoice.
    Admin,
    /// An agency's own login, confined to that agency and its descendants.
    Agency,
}

impl Role {
    /// Returns the role name as stored on the operator row.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Agency => ROLE_AGENCY,
        }
    }

    /// Parses a stored role name.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            ROLE_ADMIN => Some(Self::Admin),
            ROLE_AGENCY => Some(Self::Agency),
            _ => None,
        }
    }
}

/// An operator whose session has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor {
    pub operator_id: i64,
    pub login_name: String,
    pub display_name: String,
    pub role: Role,
    /// The agency an `Agency` operator belongs to.
    pub agency_id: Option<i64>,
    /// The session the request arrived on, when there is one.
    pub session_id: Option<i64>,
}

impl AuthenticatedActor {
    /// Builds an actor from a stored operator.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored role is unknown.
    pub fn from_operator(
        operator: &OperatorData,
        session_id: Option<i64>,
    ) -> Result<Self, AuthError> {
        let role: Role =
            Role::from_stored(&operator.role).ok_or_else(|| AuthError::AuthenticationFailed {
                reason: format!("Invalid role: {}", operator.role),
            })?;

        Ok(Self {
            operator_id: operator.operator_id,
            login_name: operator.login_name.clone(),
            display_name: operator.display_name.clone(),
            role,
            agency_id: operator.agency_id,
            session_id,
        })
    }

    /// Converts this actor into the audit representation.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::operator(self.operator_id, &self.login_name, &self.display_name)
    }

    /// Builds an audit event attributed to this actor.
    #[must_use]
    pub fn audit_event(
        &self,
        cause: Cause,
        action: &str,
        details: Option<String>,
        entity_type: &str,
        entity_id: Option<i64>,
    ) -> AuditEvent {
        AuditEvent::new(
            self.to_audit_actor(),
            cause,
            Action::new(action.to_string(), details),
            entity_type.to_string(),
            entity_id,
        )
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The set of agencies an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgencyScope {
    /// Every agency, and records not assigned to any agency.
    All,
    /// The actor's own agency and its descendants.
    Subtree(BTreeSet<i64>),
}

impl AgencyScope {
    /// Returns true if a record owned by `agency_id` is visible.
    ///
    /// Unassigned records are visible to administrators only.
    #[must_use]
    pub fn contains(&self, agency_id: Option<i64>) -> bool {
        match (self, agency_id) {
            (Self::All, _) => true,
            (Self::Subtree(ids), Some(id)) => ids.contains(&id),
            (Self::Subtree(_), None) => false,
        }
    }

    /// Returns the agency id filter to pass to list queries.
    #[must_use]
    pub fn as_filter(&self) -> Option<Vec<i64>> {
        match self {
            Self::All => None,
            Self::Subtree(ids) => Some(ids.iter().copied().collect()),
        }
    }
}

/// Role and tenant checks.
pub struct AuthorizationService;

impl AuthorizationService {
    /// Requires the actor to be an administrator.
    ///
    /// # Arguments
    ///
    /// * `actor` - The authenticated actor
    /// * `action` - The action being attempted, used in the error
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` for agency operators.
    pub fn require_admin(actor: &AuthenticatedActor, action: &str) -> Result<(), AuthError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Agency => {
                warn!(
                    operator_id = actor.operator_id,
                    action, "Rejected non-admin request"
                );
                Err(AuthError::Unauthorized {
                    action: action.to_string(),
                    required_role: String::from(ROLE_ADMIN),
                })
            }
        }
    }

    /// Computes the agencies visible to an actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the agency hierarchy cannot be loaded.
    pub fn agency_scope(
        persistence: &mut Persistence,
        actor: &AuthenticatedActor,
    ) -> Result<AgencyScope, ApiError> {
        match (actor.role, actor.agency_id) {
            (Role::Admin, _) => Ok(AgencyScope::All),
            (Role::Agency, None) => Ok(AgencyScope::Subtree(BTreeSet::new())),
            (Role::Agency, Some(own)) => {
                let parents: HashMap<i64, Option<i64>> = persistence
                    .agency_parent_map()
                    .map_err(|e| translate_persistence_error(e, "Agency"))?;
                Ok(AgencyScope::Subtree(subtree(own, &parents)))
            }
        }
    }

    /// Requires a record owned by `agency_id` to be inside `scope`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::OutOfScope` if it is not.
    pub fn authorize_agency_scope(
        actor: &AuthenticatedActor,
        agency_id: Option<i64>,
        scope: &AgencyScope,
        action: &str,
    ) -> Result<(), AuthError> {
        if scope.contains(agency_id) {
            return Ok(());
        }
        warn!(
            operator_id = actor.operator_id,
            agency_id = ?agency_id,
            action,
            "Rejected out-of-scope request"
        );
        Err(AuthError::OutOfScope {
            action: action.to_string(),
            agency_id,
        })
    }
}

/// Login, session validation and password changes.
pub struct AuthenticationService;

impl AuthenticationService {
    /// Session lifetime used when none is configured.
    pub const DEFAULT_SESSION_DAYS: i64 = 30;

    /// Authenticates an operator and opens a session.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The persistence layer
    /// * `login_name` - The login name (case-insensitive)
    /// * `password` - The plain-text password
    /// * `session_lifetime` - How long the new session stays valid
    ///
    /// # Returns
    ///
    /// A tuple of (`session_token`, `authenticated_actor`, `operator_data`)
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are wrong, the operator is
    /// disabled, or the session cannot be stored.
    pub fn login(
        persistence: &mut Persistence,
        login_name: &str,
        password: &str,
        session_lifetime: Duration,
    ) -> Result<(String, AuthenticatedActor, OperatorData), AuthError> {
        let invalid = || AuthError::AuthenticationFailed {
            reason: String::from("Invalid login name or password"),
        };

        let operator: OperatorData = persistence
            .get_operator_by_login(login_name)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| {
                warn!(login_name, "Login for unknown operator");
                invalid()
            })?;

        let verified: bool = persistence
            .verify_password(password, &operator.password_hash)
            .map_err(Self::map_persistence_error)?;
        if !verified {
            warn!(operator_id = operator.operator_id, "Login with wrong password");
            return Err(invalid());
        }

        if operator.is_disabled {
            warn!(operator_id = operator.operator_id, "Login by disabled operator");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Operator is disabled"),
            });
        }

        let session_token: String = Self::generate_session_token();
        let expires_at: String = format_timestamp(OffsetDateTime::now_utc() + session_lifetime)
            .map_err(Self::map_persistence_error)?;

        let session_id: i64 = persistence
            .create_session(&session_token, operator.operator_id, &expires_at)
            .map_err(Self::map_persistence_error)?;

        persistence
            .update_last_login(operator.operator_id)
            .map_err(Self::map_persistence_error)?;

        let actor: AuthenticatedActor =
            AuthenticatedActor::from_operator(&operator, Some(session_id))?;

        info!(
            operator_id = operator.operator_id,
            role = actor.role.as_str(),
            "Operator logged in"
        );
        Ok((session_token, actor, operator))
    }

    /// Validates a session token.
    ///
    /// # Returns
    ///
    /// A tuple of (`authenticated_actor`, `operator_data`)
    ///
    /// # Errors
    ///
    /// Returns an error if the token is unknown or expired, or the operator
    /// is missing or disabled.
    pub fn validate_session(
        persistence: &mut Persistence,
        session_token: &str,
    ) -> Result<(AuthenticatedActor, OperatorData), AuthError> {
        let session: SessionData = persistence
            .get_session_by_token(session_token)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("Invalid session token"),
            })?;

        let expires_at: OffsetDateTime =
            parse_timestamp(&session.expires_at).map_err(Self::map_persistence_error)?;
        if OffsetDateTime::now_utc() >= expires_at {
            debug!(session_id = session.session_id, "Session expired");
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Session expired"),
            });
        }

        let operator: OperatorData = persistence
            .get_operator_by_id(session.operator_id)
            .map_err(Self::map_persistence_error)?
            .ok_or_else(|| AuthError::AuthenticationFailed {
                reason: String::from("Operator not found"),
            })?;

        if operator.is_disabled {
            return Err(AuthError::AuthenticationFailed {
                reason: String::from("Operator is disabled"),
            });
        }

        persistence
            .update_session_activity(session.session_id)
            .map_err(Self::map_persistence_error)?;

        let actor: AuthenticatedActor =
            AuthenticatedActor::from_operator(&operator, Some(session.session_id))?;
        Ok((actor, operator))
    }

    /// Ends a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be deleted.
    pub fn logout(persistence: &mut Persistence, session_token: &str) -> Result<(), AuthError> {
        persistence
            .delete_session(session_token)
            .map_err(|e| AuthError::AuthenticationFailed {
                reason: format!("Failed to delete session: {e}"),
            })?;
        Ok(())
    }

    /// Changes the actor's own password.
    ///
    /// The current password must verify, the new one must satisfy the
    /// policy, and every other session of the operator is revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if the current password is wrong,
    /// `PasswordPolicyViolation` if the new one is rejected, or an internal
    /// error if storage fails.
    pub fn change_password(
        persistence: &mut Persistence,
        actor: &AuthenticatedActor,
        operator: &OperatorData,
        current_password: &str,
        new_password: &str,
        confirmation: &str,
        cause: Cause,
    ) -> Result<(), ApiError> {
        let verified: bool = persistence
            .verify_password(current_password, &operator.password_hash)
            .map_err(|e| translate_persistence_error(e, "Operator"))?;
        if !verified {
            warn!(operator_id = actor.operator_id, "Password change with wrong current password");
            return Err(ApiError::AuthenticationFailed {
                reason: String::from("Current password is incorrect"),
            });
        }

        if current_password == new_password {
            return Err(PasswordPolicyError::Unchanged.into());
        }
        PasswordPolicy::default().validate(
            new_password,
            confirmation,
            &operator.login_name,
            &operator.display_name,
        )?;

        let event: AuditEvent = actor.audit_event(
            cause,
            "ChangePassword",
            None,
            "operator",
            Some(actor.operator_id),
        );
        persistence
            .update_password(actor.operator_id, new_password, actor.session_id, &event)
            .map_err(|e| translate_persistence_error(e, "Operator"))?;

        info!(operator_id = actor.operator_id, "Password changed");
        Ok(())
    }

    /// Generates an unguessable 256-bit session token as hex.
    fn generate_session_token() -> String {
        format!(
            "{:032x}{:032x}",
            rand::random::<u128>(),
            rand::random::<u128>()
        )
    }

    fn map_persistence_error(err: PersistenceError) -> AuthError {
        AuthError::AuthenticationFailed {
            reason: format!("Database error: {err}"),
        }
    }
}
