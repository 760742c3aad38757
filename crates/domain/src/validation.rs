// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::types::CommissionRate;

pub const MAX_AGENCY_NAME_LEN: usize = 100;
pub const MAX_LIVER_NAME_LEN: usize = 100;

/// Agency fields after validation and normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAgencyFields {
    pub name: String,
    /// Upper-cased agency code.
    pub code: String,
    pub commission_rate: CommissionRate,
    pub contact_email: Option<String>,
}

/// Validates and normalises the core agency fields.
///
/// # Errors
///
/// Returns an error if:
/// - The name is empty or longer than 100 characters
/// - The code is not 2-20 characters of `A-Z`, `0-9`, `_` or `-`
/// - The commission rate does not parse or is outside 0..=100
/// - The email is present but malformed
pub fn validate_agency_fields(
    name: &str,
    code: &str,
    commission_rate: &str,
    email: Option<&str>,
) -> Result<ValidatedAgencyFields, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidAgencyName(String::from(
            "Name cannot be empty",
        )));
    }
    if name.chars().count() > MAX_AGENCY_NAME_LEN {
        return Err(DomainError::InvalidAgencyName(format!(
            "Name cannot exceed {MAX_AGENCY_NAME_LEN} characters"
        )));
    }

    let code = normalize_agency_code(code)?;
    let commission_rate: CommissionRate = commission_rate.parse()?;

    let contact_email = match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(value) => {
            validate_email(value)?;
            Some(value.to_string())
        }
        None => None,
    };

    Ok(ValidatedAgencyFields {
        name: name.to_string(),
        code,
        commission_rate,
        contact_email,
    })
}

/// Upper-cases and checks an agency code.
///
/// # Errors
///
/// Returns an error if the code is not 2-20 characters of `A-Z`, `0-9`, `_`
/// or `-`.
pub fn normalize_agency_code(code: &str) -> Result<String, DomainError> {
    let code = code.trim().to_ascii_uppercase();
    if !(2..=20).contains(&code.len()) {
        return Err(DomainError::InvalidAgencyCode(String::from(
            "Code must be 2 to 20 characters",
        )));
    }
    if !code
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    {
        return Err(DomainError::InvalidAgencyCode(format!(
            "Code '{code}' may only contain A-Z, 0-9, '_' and '-'"
        )));
    }
    Ok(code)
}

/// Checks an email address has exactly one `@` with non-empty parts and a
/// dotted domain.
///
/// # Errors
///
/// Returns `DomainError::InvalidEmail` if the address is malformed.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::InvalidEmail(email.to_string());
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Liver identity fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLiverFields {
    pub display_name: String,
    /// Handle without a leading `@`.
    pub tiktok_handle: String,
    pub tiktok_user_id: Option<String>,
}

/// Validates liver identity fields.
///
/// A leading `@` on the handle is stripped before checking.
///
/// # Errors
///
/// Returns an error if:
/// - The display name is empty or longer than 100 characters
/// - The handle is not 2-24 characters of `A-Z`, `a-z`, `0-9`, `.` or `_`
/// - The user id is present but not all digits
pub fn validate_liver_fields(
    display_name: &str,
    tiktok_handle: &str,
    tiktok_user_id: Option<&str>,
) -> Result<ValidatedLiverFields, DomainError> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(DomainError::InvalidLiverName(String::from(
            "Display name cannot be empty",
        )));
    }
    if display_name.chars().count() > MAX_LIVER_NAME_LEN {
        return Err(DomainError::InvalidLiverName(format!(
            "Display name cannot exceed {MAX_LIVER_NAME_LEN} characters"
        )));
    }

    let tiktok_handle = normalize_tiktok_handle(tiktok_handle)?;

    let tiktok_user_id = match tiktok_user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            if !id.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DomainError::InvalidTikTokUserId(format!(
                    "'{id}' must contain digits only"
                )));
            }
            Some(id.to_string())
        }
        None => None,
    };

    Ok(ValidatedLiverFields {
        display_name: display_name.to_string(),
        tiktok_handle,
        tiktok_user_id,
    })
}

/// Strips a leading `@` and checks the handle character set.
///
/// # Errors
///
/// Returns `DomainError::InvalidTikTokHandle` if the handle is malformed.
pub fn normalize_tiktok_handle(handle: &str) -> Result<String, DomainError> {
    let handle = handle.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);
    if !(2..=24).contains(&handle.len()) {
        return Err(DomainError::InvalidTikTokHandle(format!(
            "'{handle}' must be 2 to 24 characters"
        )));
    }
    if !handle
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_')
    {
        return Err(DomainError::InvalidTikTokHandle(format!(
            "'{handle}' may only contain letters, digits, '.' and '_'"
        )));
    }
    Ok(handle.to_string())
}

/// Checks a Japanese bank account number (7 digits).
///
/// # Errors
///
/// Returns `DomainError::InvalidBankAccount` if the number is not 7 digits.
pub fn validate_bank_account(number: &str) -> Result<(), DomainError> {
    let number = number.trim();
    if number.len() != 7 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::InvalidBankAccount(format!(
            "'{number}' must be exactly 7 digits"
        )));
    }
    Ok(())
}
