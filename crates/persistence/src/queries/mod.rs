// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! Every query is written once and expanded into `_sqlite` and `_mysql`
//! variants by `backend_fn!`.

pub mod agencies;
pub mod applications;
pub mod audit;
pub mod invoices;
pub mod livers;
pub mod operators;
pub mod reports;

use liverdesk_domain::Decimal;
use std::str::FromStr;

use crate::error::PersistenceError;

/// Parses a decimal stored as text.
pub(crate) fn parse_decimal(field: &str, value: &str) -> Result<Decimal, PersistenceError> {
    Decimal::from_str(value).map_err(|e| {
        PersistenceError::ReconstructionError(format!("Invalid {field} '{value}': {e}"))
    })
}
