// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Core value types shared by every layer.

use crate::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agency rank, assigned by administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgencyRank {
    S,
    A,
    B,
    C,
    D,
}

impl AgencyRank {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl FromStr for AgencyRank {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Self::S),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(DomainError::InvalidAgencyRank(s.to_string())),
        }
    }
}

impl fmt::Display for AgencyRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roster status of a liver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiverStatus {
    Active,
    Paused,
    Graduated,
    Terminated,
}

impl LiverStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Graduated => "graduated",
            Self::Terminated => "terminated",
        }
    }
}

impl FromStr for LiverStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "graduated" => Ok(Self::Graduated),
            "terminated" => Ok(Self::Terminated),
            _ => Err(DomainError::InvalidLiverStatus(s.to_string())),
        }
    }
}

impl fmt::Display for LiverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The eight fixed categories of application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationFormType {
    /// A new liver asking to join the roster.
    LiverRegistration,
    /// A new agency asking to be onboarded.
    AgencyRegistration,
    /// A liver moving from one agency to another.
    AgencyTransfer,
    /// A liver leaving the roster on good terms.
    Graduation,
    /// Change of liver profile details.
    ProfileChange,
    /// Change of payout bank details.
    BankAccountChange,
    /// Entry into a platform event.
    EventEntry,
    /// Free-form inquiry.
    Inquiry,
}

impl ApplicationFormType {
    /// Every form type, in display order.
    pub const ALL: [Self; 8] = [
        Self::LiverRegistration,
        Self::AgencyRegistration,
        Self::AgencyTransfer,
        Self::Graduation,
        Self::ProfileChange,
        Self::BankAccountChange,
        Self::EventEntry,
        Self::Inquiry,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LiverRegistration => "liver_registration",
            Self::AgencyRegistration => "agency_registration",
            Self::AgencyTransfer => "agency_transfer",
            Self::Graduation => "graduation",
            Self::ProfileChange => "profile_change",
            Self::BankAccountChange => "bank_account_change",
            Self::EventEntry => "event_entry",
            Self::Inquiry => "inquiry",
        }
    }
}

impl FromStr for ApplicationFormType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|form_type| form_type.as_str() == s)
            .ok_or_else(|| DomainError::InvalidFormType(s.to_string()))
    }
}

impl fmt::Display for ApplicationFormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar month that a monthly report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataMonth {
    year: u16,
    month: u8,
}

impl DataMonth {
    pub const MIN_YEAR: u16 = 2000;
    pub const MAX_YEAR: u16 = 2100;

    /// Creates a data month.
    ///
    /// # Errors
    ///
    /// Returns an error if the year is outside 2000..=2100 or the month
    /// outside 1..=12.
    pub fn new(year: u16, month: u8) -> Result<Self, DomainError> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(DomainError::InvalidDataMonth(format!(
                "year {year} is outside {}..={}",
                Self::MIN_YEAR,
                Self::MAX_YEAR
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidDataMonth(format!(
                "month {month} is outside 1..=12"
            )));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// The compact `YYYYMM` form used inside invoice numbers.
    #[must_use]
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// Parses the month formats found in vendor exports.
    ///
    /// Accepted: `YYYY-MM`, `YYYY/MM`, `YYYYMM`, `YYYY-MM-DD` and `YYYY年M月`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDataMonth` when no format matches or the
    /// parsed values are out of range.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        let invalid = || DomainError::InvalidDataMonth(input.to_string());

        let (year_part, month_part) = if let Some(rest) = trimmed.strip_suffix('月') {
            rest.split_once('年').ok_or_else(invalid)?
        } else if trimmed.len() == 6 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            trimmed.split_at(4)
        } else {
            let mut parts = trimmed.split(['-', '/']);
            let year = parts.next().ok_or_else(invalid)?;
            let month = parts.next().ok_or_else(invalid)?;
            // A trailing day component is allowed but must be numeric.
            if let Some(day) = parts.next() {
                if day.is_empty() || !day.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
            }
            if parts.next().is_some() {
                return Err(invalid());
            }
            (year, month)
        };

        if year_part.len() != 4 || month_part.is_empty() || month_part.len() > 2 {
            return Err(invalid());
        }
        let year: u16 = year_part.parse().map_err(|_| invalid())?;
        let month: u8 = month_part.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl FromStr for DataMonth {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DataMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Agency commission as a percentage of reward revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommissionRate(Decimal);

impl CommissionRate {
    /// Creates a commission rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is outside `0..=100`.
    pub fn new(percent: Decimal) -> Result<Self, DomainError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::InvalidCommissionRate(format!(
                "{percent} is outside 0..=100"
            )));
        }
        Ok(Self(percent.normalize()))
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    #[must_use]
    pub const fn percent(&self) -> Decimal {
        self.0
    }
}

impl FromStr for CommissionRate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim().trim_end_matches('%'))
            .map_err(|_| DomainError::InvalidCommissionRate(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for CommissionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exchange rate in JPY per USD fixed on a monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub const MAX_SCALE: u32 = 4;

    /// Creates an exchange rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is not positive or carries more than four
    /// decimal places.
    pub fn new(rate: Decimal) -> Result<Self, DomainError> {
        if rate <= Decimal::ZERO {
            return Err(DomainError::InvalidExchangeRate(format!(
                "{rate} must be greater than zero"
            )));
        }
        let normalized = rate.normalize();
        if normalized.scale() > Self::MAX_SCALE {
            return Err(DomainError::InvalidExchangeRate(format!(
                "{rate} has more than {} decimal places",
                Self::MAX_SCALE
            )));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for ExchangeRate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| DomainError::InvalidExchangeRate(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(DataMonth);
string_serde!(CommissionRate);
string_serde!(ExchangeRate);

/// Qualified invoice issuer registration number (`T` + 13 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceRegistrationNumber(String);

impl InvoiceRegistrationNumber {
    /// Parses a registration number, accepting a lower-case prefix and
    /// embedded hyphens or spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not `T` followed by 13 digits.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        let mut chars = compact.chars();
        let prefix_ok = matches!(chars.next(), Some('T' | 't'));
        let digits: String = chars.collect();
        if !prefix_ok || digits.len() != 13 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidRegistrationNumber(input.to_string()));
        }
        Ok(Self(format!("T{digits}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InvoiceRegistrationNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InvoiceRegistrationNumber> for String {
    fn from(value: InvoiceRegistrationNumber) -> Self {
        value.0
    }
}

impl fmt::Display for InvoiceRegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
