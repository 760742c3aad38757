// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Session extraction for the server.
//!
//! Every route except login and health resolves its operator through
//! [`SessionOperator`], so authentication is enforced at the server
//! boundary before any API handler runs.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use liverdesk_api::{AuthenticatedActor, AuthenticationService};
use liverdesk_persistence::OperatorData;
use tracing::{debug, warn};

use crate::{AppState, ErrorResponse};

/// Extracts the bearer token from request headers.
///
/// # Errors
///
/// Returns an error if the header is missing, not valid ASCII, or does not
/// use the `Bearer` scheme.
fn bearer_token(parts: &Parts) -> Result<&str, SessionError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| {
            debug!("Missing Authorization header");
            SessionError::MissingAuthorizationHeader
        })?
        .to_str()
        .map_err(|_| {
            warn!("Invalid Authorization header encoding");
            SessionError::InvalidAuthorizationHeader
        })?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            warn!("Authorization header does not carry a bearer token");
            SessionError::InvalidAuthorizationHeader
        })
}

/// Extractor for authenticated operators.
///
/// Validates the session token from the `Authorization: Bearer <token>`
/// header and yields the actor together with the operator record and the
/// raw token (needed by logout).
///
/// # Errors
///
/// Rejects with HTTP 401 if the header is missing or malformed, the token is
/// unknown or expired, or the operator is disabled.
pub struct SessionOperator {
    pub actor: AuthenticatedActor,
    pub operator: OperatorData,
    pub token: String,
}

impl FromRequestParts<AppState> for SessionOperator {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token: String = bearer_token(parts)?.to_string();

        let mut persistence = state.persistence.lock().await;
        let (actor, operator) = AuthenticationService::validate_session(&mut persistence, &token)
            .map_err(|e| {
                warn!(error = %e, "Session validation failed");
                SessionError::InvalidSession(e.to_string())
            })?;
        drop(persistence);

        debug!(
            operator_id = operator.operator_id,
            role = actor.role.as_str(),
            "Session validated"
        );

        Ok(Self {
            actor,
            operator,
            token,
        })
    }
}

/// Extractor for operators allowed to use the system.
///
/// Wraps [`SessionOperator`] and additionally rejects operators that still
/// carry a provisioned password. Those may only reach whoami, logout and
/// the password change route.
///
/// # Errors
///
/// Rejects with HTTP 401 for an invalid session and HTTP 403 while a
/// password change is pending.
pub struct ActiveOperator(pub SessionOperator);

impl FromRequestParts<AppState> for ActiveOperator {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session: SessionOperator = SessionOperator::from_request_parts(parts, state).await?;
        if session.operator.must_change_password {
            warn!(
                operator_id = session.operator.operator_id,
                "Request refused until the password is changed"
            );
            return Err(SessionError::PasswordChangeRequired);
        }
        Ok(Self(session))
    }
}

/// Session extraction errors.
#[derive(Debug)]
pub enum SessionError {
    /// Authorization header is missing.
    MissingAuthorizationHeader,
    /// Authorization header format is invalid.
    InvalidAuthorizationHeader,
    /// Session validation failed.
    InvalidSession(String),
    /// The operator must change a provisioned password first.
    PasswordChangeRequired,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, message): (StatusCode, String) = match self {
            Self::MissingAuthorizationHeader => (
                StatusCode::UNAUTHORIZED,
                String::from("Missing Authorization header"),
            ),
            Self::InvalidAuthorizationHeader => (
                StatusCode::UNAUTHORIZED,
                String::from("Invalid Authorization header format. Expected: 'Bearer <token>'"),
            ),
            Self::InvalidSession(reason) => (
                StatusCode::UNAUTHORIZED,
                format!("Session validation failed: {reason}"),
            ),
            Self::PasswordChangeRequired => (
                StatusCode::FORBIDDEN,
                String::from("Password change required before continuing"),
            ),
        };

        (
            status,
            axum::Json(ErrorResponse {
                error: true,
                message,
            }),
        )
            .into_response()
    }
}
