// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_audit::Cause;
use liverdesk_persistence::{OperatorData, Persistence};
use time::Duration;
use tracing::info;

use crate::auth::{AuthenticatedActor, AuthenticationService};
use crate::capabilities::compute_capabilities;
use crate::error::ApiError;
use crate::request_response::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, OperatorInfo,
    WhoAmIResponse,
};

/// Logs an operator in.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The credentials
/// * `session_lifetime` - How long the new session stays valid
///
/// # Errors
///
/// Returns `AuthenticationFailed` for unknown logins, wrong passwords and
/// disabled operators.
pub fn login(
    persistence: &mut Persistence,
    request: &LoginRequest,
    session_lifetime: Duration,
) -> Result<LoginResponse, ApiError> {
    let (session_token, actor, operator) = AuthenticationService::login(
        persistence,
        &request.login_name,
        &request.password,
        session_lifetime,
    )?;

    Ok(LoginResponse {
        session_token,
        capabilities: compute_capabilities(&actor, &operator),
        operator: OperatorInfo::from(&operator),
    })
}

/// Ends the session identified by `session_token`.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub fn logout(persistence: &mut Persistence, session_token: &str) -> Result<(), ApiError> {
    AuthenticationService::logout(persistence, session_token)?;
    info!("Session ended");
    Ok(())
}

/// Describes the logged-in operator and what they may do.
#[must_use]
pub fn whoami(authenticated_actor: &AuthenticatedActor, operator: &OperatorData) -> WhoAmIResponse {
    WhoAmIResponse {
        operator: OperatorInfo::from(operator),
        capabilities: compute_capabilities(authenticated_actor, operator),
    }
}

/// Changes the caller's own password.
///
/// Clears any forced password change and revokes the caller's other
/// sessions.
///
/// # Errors
///
/// Returns an error if the current password is wrong or the new password
/// violates the policy.
pub fn change_password(
    persistence: &mut Persistence,
    request: &ChangePasswordRequest,
    authenticated_actor: &AuthenticatedActor,
    operator: &OperatorData,
    cause: Cause,
) -> Result<MessageResponse, ApiError> {
    AuthenticationService::change_password(
        persistence,
        authenticated_actor,
        operator,
        &request.current_password,
        &request.new_password,
        &request.new_password_confirmation,
        cause,
    )?;

    Ok(MessageResponse {
        message: String::from("Password changed"),
    })
}
