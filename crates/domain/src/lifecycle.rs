// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Application review lifecycle.
//!
//! Applications are moved between states by administrators only. Every
//! transition is checked here before persistence applies it.

use crate::error::DomainError;
use crate::types::ApplicationFormType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Submitted, not yet picked up
    Pending,
    /// An administrator is reviewing it
    InReview,
    /// Approved; follow-up work may still be outstanding
    Authorized,
    /// Declined
    Rejected,
    /// Withdrawn by the applicant
    Withdrawn,
    /// Approved and fully processed
    Completed,
}

impl ApplicationStatus {
    /// Returns the string representation used for persistence and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Authorized => "authorized",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Completed => "completed",
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Withdrawn | Self::Completed)
    }

    /// Validates a transition from this status to `to`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStatusTransition` if the transition is not
    /// part of the lifecycle.
    pub fn validate_transition(&self, to: Self) -> Result<(), DomainError> {
        let refuse = |reason: &str| {
            Err(DomainError::InvalidStatusTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: reason.to_string(),
            })
        };

        if *self == to {
            return refuse("application is already in this status");
        }
        if self.is_terminal() {
            return refuse("cannot transition from terminal state");
        }

        let valid = match self {
            Self::Pending => matches!(
                to,
                Self::InReview | Self::Authorized | Self::Rejected | Self::Withdrawn
            ),
            Self::InReview => matches!(to, Self::Authorized | Self::Rejected | Self::Pending),
            Self::Authorized => matches!(to, Self::Completed),
            Self::Rejected | Self::Withdrawn | Self::Completed => false,
        };

        if valid {
            Ok(())
        } else {
            refuse("transition not permitted by application lifecycle rules")
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_review" => Ok(Self::InReview),
            "authorized" => Ok(Self::Authorized),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            "completed" => Ok(Self::Completed),
            _ => Err(DomainError::InvalidApplicationStatus(s.to_string())),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if authorizing an application of this type creates a liver.
#[must_use]
pub const fn requires_liver_creation(form_type: ApplicationFormType) -> bool {
    matches!(form_type, ApplicationFormType::LiverRegistration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(!ApplicationStatus::InReview.is_terminal());
        assert!(!ApplicationStatus::Authorized.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::Withdrawn.is_terminal());
        assert!(ApplicationStatus::Completed.is_terminal());
    }

    #[test]
    fn test_pending_transitions() {
        let from = ApplicationStatus::Pending;
        assert!(from.validate_transition(ApplicationStatus::InReview).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Authorized).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Rejected).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Withdrawn).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Completed).is_err());
    }

    #[test]
    fn test_in_review_can_return_to_pending() {
        let from = ApplicationStatus::InReview;
        assert!(from.validate_transition(ApplicationStatus::Pending).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Withdrawn).is_err());
    }

    #[test]
    fn test_authorized_only_completes() {
        let from = ApplicationStatus::Authorized;
        assert!(from.validate_transition(ApplicationStatus::Completed).is_ok());
        assert!(from.validate_transition(ApplicationStatus::Rejected).is_err());
        assert!(from.validate_transition(ApplicationStatus::Pending).is_err());
    }

    #[test]
    fn test_same_status_rejected() {
        let result = ApplicationStatus::Pending.validate_transition(ApplicationStatus::Pending);
        match result {
            Err(DomainError::InvalidStatusTransition { reason, .. }) => {
                assert!(reason.contains("already"));
            }
            other => panic!("expected InvalidStatusTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        for from in [
            ApplicationStatus::Rejected,
            ApplicationStatus::Withdrawn,
            ApplicationStatus::Completed,
        ] {
            assert!(from.validate_transition(ApplicationStatus::Pending).is_err());
            assert!(from.validate_transition(ApplicationStatus::InReview).is_err());
        }
    }

    #[test]
    fn test_only_liver_registration_creates_liver() {
        for form_type in ApplicationFormType::ALL {
            assert_eq!(
                requires_liver_creation(form_type),
                form_type == ApplicationFormType::LiverRegistration
            );
        }
    }
}
