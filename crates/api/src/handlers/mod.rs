// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request handlers.
//!
//! Every handler takes the persistence layer, the request, the
//! authenticated actor and the audit cause, enforces authorization before
//! touching any data, and returns a response DTO or an `ApiError`.

pub mod agencies;
pub mod applications;
pub mod audit;
pub mod auth;
pub mod invoices;
pub mod livers;
pub mod operators;
pub mod reports;

use chrono::{Datelike, Utc};
use chrono_tz::Asia::Tokyo;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month};

use liverdesk_domain::Decimal;

use crate::error::ApiError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Trims an optional text field, treating blank input as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn not_found(resource_type: &str, id: i64) -> ApiError {
    ApiError::ResourceNotFound {
        resource_type: resource_type.to_string(),
        message: format!("{resource_type} {id} not found"),
    }
}

fn total_overflow(field: &str) -> ApiError {
    ApiError::InvalidInput {
        field: field.to_string(),
        message: String::from("Total is too large to represent"),
    }
}

/// Sums yen amounts, failing instead of wrapping.
pub(crate) fn checked_total_jpy(
    field: &str,
    amounts: impl IntoIterator<Item = i64>,
) -> Result<i64, ApiError> {
    amounts
        .into_iter()
        .try_fold(0_i64, i64::checked_add)
        .ok_or_else(|| total_overflow(field))
}

/// Sums decimal amounts, failing instead of panicking.
pub(crate) fn checked_total_decimal(
    field: &str,
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ApiError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| total_overflow(field))
}

/// The current calendar date in Japan, which decides invoice tax rules.
pub(crate) fn today_in_japan() -> Result<Date, ApiError> {
    let today = Utc::now().with_timezone(&Tokyo).date_naive();
    let month: Month = u8::try_from(today.month())
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| ApiError::Internal {
            message: format!("Invalid calendar month {}", today.month()),
        })?;
    let day: u8 = u8::try_from(today.day()).map_err(|_| ApiError::Internal {
        message: format!("Invalid calendar day {}", today.day()),
    })?;
    Date::from_calendar_date(today.year(), month, day).map_err(|e| ApiError::Internal {
        message: format!("Invalid calendar date: {e}"),
    })
}

/// Parses a `YYYY-MM-DD` date.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<Date, ApiError> {
    Date::parse(value.trim(), DATE_FORMAT).map_err(|_| ApiError::InvalidInput {
        field: field.to_string(),
        message: format!("'{value}' is not a date in YYYY-MM-DD format"),
    })
}

pub(crate) fn format_date(date: Date) -> Result<String, ApiError> {
    date.format(DATE_FORMAT).map_err(|e| ApiError::Internal {
        message: format!("Failed to format date: {e}"),
    })
}

/// Resolves an invoice issue date, defaulting to today in Japan.
pub(crate) fn resolve_issue_date(value: Option<&str>) -> Result<Date, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => parse_date("issue_date", text),
        None => today_in_japan(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  memo ")), Some(String::from("memo")));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_parse_and_format_date() {
        let date = parse_date("issue_date", "2024-06-10").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), Month::June);
        assert_eq!(format_date(date).unwrap(), "2024-06-10");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        let err = parse_date("issue_date", "10/06/2024").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "issue_date"));
    }

    #[test]
    fn test_checked_totals() {
        assert_eq!(checked_total_jpy("total", [1_000, 2_500]).unwrap(), 3_500);
        assert_eq!(checked_total_jpy("total", []).unwrap(), 0);
        let err = checked_total_jpy("total_reward_jpy", [i64::MAX, 1]).unwrap_err();
        assert!(
            matches!(err, ApiError::InvalidInput { ref field, .. } if field == "total_reward_jpy")
        );

        assert_eq!(
            checked_total_decimal("total", [Decimal::new(105, 1), Decimal::ONE]).unwrap(),
            Decimal::new(115, 1)
        );
        assert!(checked_total_decimal("total", [Decimal::MAX, Decimal::ONE]).is_err());
    }

    #[test]
    fn test_resolve_issue_date_defaults_to_today() {
        assert!(resolve_issue_date(None).is_ok());
        assert!(resolve_issue_date(Some(" ")).is_ok());
    }
}
