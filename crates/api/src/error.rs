// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use crate::csv_import::CsvImportError;
use crate::password_policy::PasswordPolicyError;
use liverdesk_domain::DomainError;
use liverdesk_persistence::PersistenceError;

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The actor's role does not permit the action.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
    /// The record belongs to an agency outside the actor's subtree.
    OutOfScope {
        /// The action that was attempted.
        action: String,
        /// The agency the record belongs to, if any.
        agency_id: Option<i64>,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role} role")
            }
            Self::OutOfScope { action, agency_id } => match agency_id {
                Some(id) => write!(f, "Unauthorized: '{action}' on agency {id} is out of scope"),
                None => write!(f, "Unauthorized: '{action}' on unassigned records is out of scope"),
            },
        }
    }
}

impl std::error::Error for AuthError {}

/// API-level errors.
///
/// These are distinct from domain and persistence errors and represent the
/// API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Authentication failed.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// The actor's role does not permit the action.
    Unauthorized {
        /// The action that was attempted.
        action: String,
        /// The role required for this action.
        required_role: String,
    },
    /// The record is outside the actor's agency subtree.
    Forbidden {
        /// A human-readable description.
        message: String,
    },
    /// A domain rule was violated.
    DomainRuleViolation {
        /// The rule that was violated.
        rule: String,
        /// A human-readable description of the violation.
        message: String,
    },
    /// Invalid input was provided.
    InvalidInput {
        /// The field that was invalid.
        field: String,
        /// A human-readable description of the error.
        message: String,
    },
    /// A requested resource was not found.
    ResourceNotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// The request conflicts with existing data.
    Conflict {
        /// The type of resource in conflict.
        resource_type: String,
        /// A human-readable description of the conflict.
        message: String,
    },
    /// The uploaded CSV could not be used.
    InvalidCsvFormat {
        /// Why the file was rejected.
        reason: String,
    },
    /// Password policy violation.
    PasswordPolicyViolation {
        /// A human-readable description of the policy violation.
        message: String,
    },
    /// An internal error occurred.
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Unauthorized {
                action,
                required_role,
            } => {
                write!(f, "Unauthorized: '{action}' requires {required_role} role")
            }
            Self::Forbidden { message } => write!(f, "Forbidden: {message}"),
            Self::DomainRuleViolation { rule, message } => {
                write!(f, "Domain rule violation ({rule}): {message}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ResourceNotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::Conflict {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} conflict: {message}")
            }
            Self::InvalidCsvFormat { reason } => write!(f, "Invalid CSV: {reason}"),
            Self::PasswordPolicyViolation { message } => {
                write!(f, "Password policy violation: {message}")
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed { reason } => Self::AuthenticationFailed { reason },
            AuthError::Unauthorized {
                action,
                required_role,
            } => Self::Unauthorized {
                action,
                required_role,
            },
            err @ AuthError::OutOfScope { .. } => Self::Forbidden {
                message: err.to_string(),
            },
        }
    }
}

impl From<PasswordPolicyError> for ApiError {
    fn from(err: PasswordPolicyError) -> Self {
        Self::PasswordPolicyViolation {
            message: err.to_string(),
        }
    }
}

impl From<CsvImportError> for ApiError {
    fn from(err: CsvImportError) -> Self {
        Self::InvalidCsvFormat {
            reason: err.to_string(),
        }
    }
}

fn invalid(field: &str, message: String) -> ApiError {
    ApiError::InvalidInput {
        field: field.to_string(),
        message,
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidAgencyName(msg) => invalid("name", msg),
        DomainError::InvalidAgencyCode(msg) => invalid("code", msg),
        DomainError::InvalidAgencyRank(msg) => invalid("rank", msg),
        DomainError::InvalidCommissionRate(msg) => invalid("commission_rate", msg),
        DomainError::InvalidExchangeRate(msg) => invalid("exchange_rate", msg),
        DomainError::InvalidEmail(msg) => invalid("email", msg),
        DomainError::InvalidBankAccount(msg) => invalid("bank_account_number", msg),
        DomainError::InvalidRegistrationNumber(msg) => {
            invalid("invoice_registration_number", msg)
        }
        DomainError::InvalidLiverName(msg) => invalid("display_name", msg),
        DomainError::InvalidTikTokHandle(msg) => invalid("tiktok_handle", msg),
        DomainError::InvalidTikTokUserId(msg) => invalid("tiktok_user_id", msg),
        DomainError::InvalidLiverStatus(msg) => invalid("status", msg),
        DomainError::InvalidFormType(msg) => invalid("form_type", msg),
        DomainError::InvalidApplicationStatus(msg) => invalid("status", msg),
        DomainError::InvalidDataMonth(msg) => invalid("data_month", msg),
        err @ DomainError::InvalidStatusTransition { .. } => ApiError::DomainRuleViolation {
            rule: String::from("application_lifecycle"),
            message: err.to_string(),
        },
        err @ (DomainError::CircularAgencyHierarchy { .. }
        | DomainError::HierarchyTooDeep { .. }) => ApiError::DomainRuleViolation {
            rule: String::from("agency_hierarchy"),
            message: err.to_string(),
        },
        err @ DomainError::NegativeAmount { .. } => ApiError::DomainRuleViolation {
            rule: String::from("non_negative_amount"),
            message: err.to_string(),
        },
        err @ DomainError::AmountOverflow { .. } => ApiError::Internal {
            message: err.to_string(),
        },
    }
}

/// Translates a persistence error into an API error.
///
/// `resource_type` names the record the caller was working on and is used
/// for not-found and conflict messages.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError, resource_type: &str) -> ApiError {
    match err {
        PersistenceError::NotFound(message) => ApiError::ResourceNotFound {
            resource_type: resource_type.to_string(),
            message,
        },
        PersistenceError::UniqueViolation(message) => ApiError::Conflict {
            resource_type: resource_type.to_string(),
            message: format!("Duplicate value: {message}"),
        },
        PersistenceError::ForeignKeyViolation(message) => ApiError::InvalidInput {
            field: String::from("reference"),
            message: format!("Referenced record does not exist: {message}"),
        },
        err @ (PersistenceError::StaleWrite { .. }
        | PersistenceError::DuplicateDataMonth { .. }
        | PersistenceError::ReportHasInvoices { .. }
        | PersistenceError::Referenced { .. }) => ApiError::Conflict {
            resource_type: resource_type.to_string(),
            message: err.to_string(),
        },
        other => ApiError::Internal {
            message: other.to_string(),
        },
    }
}
