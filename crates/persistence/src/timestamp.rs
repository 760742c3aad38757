// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Timestamp text format shared by every table.
//!
//! Timestamps are written from Rust as `YYYY-MM-DD HH:MM:SS` in UTC so that
//! plain text comparison orders them on both backends.

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::PersistenceError;

pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Formats a timestamp for storage.
///
/// # Errors
///
/// Returns an error if the value cannot be formatted.
pub fn format_timestamp(value: OffsetDateTime) -> Result<String, PersistenceError> {
    value
        .to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp: {e}")))
}

/// The current UTC time in storage format.
///
/// # Errors
///
/// Returns an error if the value cannot be formatted.
pub fn now_timestamp() -> Result<String, PersistenceError> {
    format_timestamp(OffsetDateTime::now_utc())
}

/// Parses a stored timestamp as UTC.
///
/// # Errors
///
/// Returns an error if the text is not in storage format.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime, PersistenceError> {
    time::PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .map(time::PrimitiveDateTime::assume_utc)
        .map_err(|e| PersistenceError::ReconstructionError(format!("timestamp '{value}': {e}")))
}
