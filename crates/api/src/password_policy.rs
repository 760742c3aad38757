// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Password policy validation and temporary password generation.
//!
//! Operator passwords chosen by people are checked against `PasswordPolicy`.
//! Passwords chosen by the system for freshly provisioned agency logins come
//! from `generate_temporary_password` and always satisfy the policy.

use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

/// Password policy errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    /// Password is too short.
    #[error("Password must be at least {min_length} characters long")]
    TooShort { min_length: usize },

    /// Password does not mix enough character classes.
    #[error(
        "Password must contain at least {required} of the following: uppercase letter, lowercase letter, digit, symbol (found {found})"
    )]
    InsufficientComplexity { required: usize, found: usize },

    /// Password equals an identifying field of the operator.
    #[error("Password must not match {field}")]
    MatchesForbiddenField { field: String },

    /// Password and confirmation differ.
    #[error("Password and confirmation do not match")]
    ConfirmationMismatch,

    /// The new password is the one being replaced.
    #[error("New password must differ from the current password")]
    Unchanged,
}

/// Password policy configuration.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Minimum number of character classes (out of 4).
    pub min_complexity: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 12,
            min_complexity: 3,
        }
    }
}

impl PasswordPolicy {
    /// Validates a new password for an operator.
    ///
    /// # Arguments
    ///
    /// * `password` - The proposed password
    /// * `confirmation` - The password typed a second time
    /// * `login_name` - The operator login name (password must not match)
    /// * `display_name` - The operator display name (password must not match)
    ///
    /// # Errors
    ///
    /// Returns the first policy rule the password breaks.
    pub fn validate(
        &self,
        password: &str,
        confirmation: &str,
        login_name: &str,
        display_name: &str,
    ) -> Result<(), PasswordPolicyError> {
        if password != confirmation {
            return Err(PasswordPolicyError::ConfirmationMismatch);
        }

        if password.chars().count() < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
            });
        }

        let found: usize = character_classes(password);
        if found < self.min_complexity {
            return Err(PasswordPolicyError::InsufficientComplexity {
                required: self.min_complexity,
                found,
            });
        }

        let forbidden = [("login_name", login_name), ("display_name", display_name)];
        for (field, value) in forbidden {
            if password.eq_ignore_ascii_case(value.trim()) {
                return Err(PasswordPolicyError::MatchesForbiddenField {
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Counts how many of upper case, lower case, digit and symbol appear.
fn character_classes(password: &str) -> usize {
    let checks: [fn(&char) -> bool; 4] = [
        char::is_ascii_uppercase,
        char::is_ascii_lowercase,
        char::is_ascii_digit,
        |c| !c.is_alphanumeric() && !c.is_whitespace(),
    ];
    checks
        .iter()
        .filter(|check| password.chars().any(|c| check(&c)))
        .count()
}

/// Length of generated temporary passwords.
pub const TEMPORARY_PASSWORD_LENGTH: usize = 16;

// Look-alike characters (0/O, 1/l/I) are left out.
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!#$%&*+-=?@";

/// Generates a temporary password for a newly provisioned login.
///
/// The password is 16 characters from an alphabet without look-alike
/// characters and contains at least one upper case letter, lower case
/// letter, digit and symbol.
#[must_use]
pub fn generate_temporary_password() -> String {
    let mut rng = rand::rng();
    let classes: [&[u8]; 4] = [UPPER, LOWER, DIGITS, SYMBOLS];
    let combined: Vec<u8> = classes.concat();

    let mut bytes: Vec<u8> = classes
        .iter()
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();
    let remaining: usize = TEMPORARY_PASSWORD_LENGTH.saturating_sub(bytes.len());
    bytes.extend(
        std::iter::repeat_with(|| combined.choose(&mut rng).copied())
            .take(remaining)
            .flatten(),
    );

    // The guaranteed classes must not always lead.
    bytes.shuffle(&mut rng);

    bytes.into_iter().map(char::from).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_passwords() {
        let policy: PasswordPolicy = PasswordPolicy::default();

        assert!(
            policy
                .validate("MyP@ssw0rd123", "MyP@ssw0rd123", "ops1", "Ops One")
                .is_ok()
        );
        assert!(
            policy
                .validate("MyPassword123", "MyPassword123", "ops1", "Ops One")
                .is_ok()
        );
        assert!(
            policy
                .validate("mypassword123!", "mypassword123!", "ops1", "Ops One")
                .is_ok()
        );
    }

    #[test]
    fn test_confirmation_checked_first() {
        let policy: PasswordPolicy = PasswordPolicy::default();
        assert_eq!(
            policy.validate("short", "other", "ops1", "Ops One"),
            Err(PasswordPolicyError::ConfirmationMismatch)
        );
    }

    #[test]
    fn test_too_short() {
        let policy: PasswordPolicy = PasswordPolicy::default();
        assert_eq!(
            policy.validate("Short1!", "Short1!", "ops1", "Ops One"),
            Err(PasswordPolicyError::TooShort { min_length: 12 })
        );
    }

    #[test]
    fn test_insufficient_complexity() {
        let policy: PasswordPolicy = PasswordPolicy::default();
        assert_eq!(
            policy.validate("alllowercaseletters", "alllowercaseletters", "ops1", "Ops One"),
            Err(PasswordPolicyError::InsufficientComplexity {
                required: 3,
                found: 1
            })
        );
    }

    #[test]
    fn test_matches_login_name_ignoring_case() {
        let policy: PasswordPolicy = PasswordPolicy::default();
        assert_eq!(
            policy.validate("AgencyLogin-01", "AgencyLogin-01", "AGENCYLOGIN-01", "Someone"),
            Err(PasswordPolicyError::MatchesForbiddenField {
                field: String::from("login_name")
            })
        );
    }

    #[test]
    fn test_generated_password_shape() {
        let policy: PasswordPolicy = PasswordPolicy::default();
        for _ in 0..200 {
            let password: String = generate_temporary_password();
            assert_eq!(password.len(), TEMPORARY_PASSWORD_LENGTH);
            assert!(password.bytes().any(|b| UPPER.contains(&b)));
            assert!(password.bytes().any(|b| LOWER.contains(&b)));
            assert!(password.bytes().any(|b| DIGITS.contains(&b)));
            assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
            assert!(!password.contains(['0', 'O', '1', 'l', 'I']));
            assert!(
                policy
                    .validate(&password, &password, "agency", "Agency")
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_generated_password_classes_are_shuffled() {
        let leads_with_upper: usize = (0..200)
            .map(|_| generate_temporary_password())
            .filter(|p| p.bytes().next().is_some_and(|b| UPPER.contains(&b)))
            .count();
        assert!(leads_with_upper < 200);
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_temporary_password(), generate_temporary_password());
    }
}
