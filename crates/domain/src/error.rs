// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Agency name is empty or too long.
    InvalidAgencyName(String),
    /// Agency code does not match the allowed format.
    InvalidAgencyCode(String),
    /// Agency rank is not one of the known ranks.
    InvalidAgencyRank(String),
    /// Commission rate is outside 0..=100 or not a number.
    InvalidCommissionRate(String),
    /// Exchange rate is not a positive number.
    InvalidExchangeRate(String),
    /// Email address is malformed.
    InvalidEmail(String),
    /// Bank account number is malformed.
    InvalidBankAccount(String),
    /// Invoice registration number is malformed.
    InvalidRegistrationNumber(String),
    /// Liver display name is empty or too long.
    InvalidLiverName(String),
    /// TikTok handle is malformed.
    InvalidTikTokHandle(String),
    /// TikTok user id is malformed.
    InvalidTikTokUserId(String),
    /// Liver status is not one of the known statuses.
    InvalidLiverStatus(String),
    /// Application form type is not one of the eight known types.
    InvalidFormType(String),
    /// Application status is not one of the known statuses.
    InvalidApplicationStatus(String),
    /// Data month could not be parsed or is out of range.
    InvalidDataMonth(String),
    /// An application status transition is not permitted.
    InvalidStatusTransition {
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
        /// Why the transition was refused.
        reason: String,
    },
    /// Assigning the parent would create a cycle in the agency hierarchy.
    CircularAgencyHierarchy {
        /// The agency being re-parented.
        agency_id: i64,
        /// The requested parent.
        parent_id: i64,
    },
    /// The parent chain is longer than the supported depth.
    HierarchyTooDeep {
        /// The agency whose chain was being walked.
        agency_id: i64,
        /// The maximum supported depth.
        max_depth: usize,
    },
    /// A monetary amount that must be non-negative was negative.
    NegativeAmount {
        /// The field holding the amount.
        field: String,
        /// The offending value.
        value: String,
    },
    /// A monetary computation overflowed the supported range.
    AmountOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAgencyName(msg) => write!(f, "Invalid agency name: {msg}"),
            Self::InvalidAgencyCode(msg) => write!(f, "Invalid agency code: {msg}"),
            Self::InvalidAgencyRank(msg) => write!(f, "Invalid agency rank: {msg}"),
            Self::InvalidCommissionRate(msg) => write!(f, "Invalid commission rate: {msg}"),
            Self::InvalidExchangeRate(msg) => write!(f, "Invalid exchange rate: {msg}"),
            Self::InvalidEmail(msg) => write!(f, "Invalid email: {msg}"),
            Self::InvalidBankAccount(msg) => write!(f, "Invalid bank account: {msg}"),
            Self::InvalidRegistrationNumber(msg) => {
                write!(f, "Invalid invoice registration number: {msg}")
            }
            Self::InvalidLiverName(msg) => write!(f, "Invalid liver name: {msg}"),
            Self::InvalidTikTokHandle(msg) => write!(f, "Invalid TikTok handle: {msg}"),
            Self::InvalidTikTokUserId(msg) => write!(f, "Invalid TikTok user id: {msg}"),
            Self::InvalidLiverStatus(msg) => write!(f, "Invalid liver status: {msg}"),
            Self::InvalidFormType(msg) => write!(f, "Invalid application form type: {msg}"),
            Self::InvalidApplicationStatus(msg) => {
                write!(f, "Invalid application status: {msg}")
            }
            Self::InvalidDataMonth(msg) => write!(f, "Invalid data month: {msg}"),
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Cannot move application from '{from}' to '{to}': {reason}")
            }
            Self::CircularAgencyHierarchy {
                agency_id,
                parent_id,
            } => {
                write!(
                    f,
                    "Agency {parent_id} cannot be the parent of agency {agency_id}: hierarchy would be circular"
                )
            }
            Self::HierarchyTooDeep {
                agency_id,
                max_depth,
            } => {
                write!(
                    f,
                    "Parent chain of agency {agency_id} exceeds the maximum depth of {max_depth}"
                )
            }
            Self::NegativeAmount { field, value } => {
                write!(f, "{field} must not be negative (got {value})")
            }
            Self::AmountOverflow { operation } => {
                write!(f, "Amount overflow while {operation}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
