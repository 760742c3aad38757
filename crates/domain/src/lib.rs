// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod calculation;
mod error;
mod hierarchy;
mod invoice_number;
mod lifecycle;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use calculation::{
    CONSUMPTION_TAX_PERCENT, INVOICE_SYSTEM_START, InvoiceTotals, RewardLine,
    TRANSITION_END, TRANSITION_HALF_START, commission_jpy, consumption_tax, deductible_rate,
    usd_to_jpy,
};
pub use error::DomainError;
pub use hierarchy::{MAX_HIERARCHY_DEPTH, descendants, subtree, validate_parent_assignment};
pub use invoice_number::{
    INVOICE_NUMBER_PREFIX, format_invoice_number, next_invoice_number, parse_sequence,
};
pub use lifecycle::{ApplicationStatus, requires_liver_creation};

// Re-export public types
pub use types::{
    AgencyRank, ApplicationFormType, CommissionRate, DataMonth, ExchangeRate,
    InvoiceRegistrationNumber, LiverStatus,
};
pub use validation::{
    MAX_AGENCY_NAME_LEN, MAX_LIVER_NAME_LEN, ValidatedAgencyFields, ValidatedLiverFields,
    normalize_agency_code, normalize_tiktok_handle, validate_agency_fields,
    validate_bank_account, validate_email, validate_liver_fields,
};

// Decimal is part of the public API of several types here.
pub use rust_decimal::Decimal;
