// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reward, commission and consumption tax arithmetic.
//!
//! All yen amounts are whole yen. Every conversion from a fractional value
//! rounds toward negative infinity.

use crate::error::DomainError;
use crate::types::{CommissionRate, ExchangeRate};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;
use time::macros::date;

/// Consumption tax rate in percent.
pub const CONSUMPTION_TAX_PERCENT: i64 = 10;

/// Start of the qualified invoice system.
pub const INVOICE_SYSTEM_START: Date = date!(2023 - 10 - 01);
/// First day of the 50% transitional deduction period.
pub const TRANSITION_HALF_START: Date = date!(2026 - 10 - 01);
/// First day on which purchases from unregistered issuers earn no deduction.
pub const TRANSITION_END: Date = date!(2029 - 10 - 01);

fn to_yen(value: Decimal, operation: &str) -> Result<i64, DomainError> {
    value.floor().to_i64().ok_or_else(|| DomainError::AmountOverflow {
        operation: operation.to_string(),
    })
}

fn checked_product(a: Decimal, b: Decimal, operation: &str) -> Result<Decimal, DomainError> {
    a.checked_mul(b).ok_or_else(|| DomainError::AmountOverflow {
        operation: operation.to_string(),
    })
}

/// Converts a USD amount to whole yen at `rate`.
///
/// # Errors
///
/// Returns an error if `usd` is negative or the result overflows.
pub fn usd_to_jpy(usd: Decimal, rate: ExchangeRate) -> Result<i64, DomainError> {
    if usd.is_sign_negative() && !usd.is_zero() {
        return Err(DomainError::NegativeAmount {
            field: String::from("reward_usd"),
            value: usd.to_string(),
        });
    }
    let product = checked_product(usd, rate.value(), "converting USD to JPY")?;
    to_yen(product, "converting USD to JPY")
}

/// Agency commission on a yen reward.
///
/// # Errors
///
/// Returns an error if `reward_jpy` is negative or the result overflows.
pub fn commission_jpy(reward_jpy: i64, rate: CommissionRate) -> Result<i64, DomainError> {
    if reward_jpy < 0 {
        return Err(DomainError::NegativeAmount {
            field: String::from("reward_jpy"),
            value: reward_jpy.to_string(),
        });
    }
    let product = checked_product(
        Decimal::from(reward_jpy),
        rate.percent(),
        "computing commission",
    )?;
    to_yen(product / Decimal::ONE_HUNDRED, "computing commission")
}

/// Consumption tax on a non-negative yen amount.
#[must_use]
pub const fn consumption_tax(amount_jpy: i64) -> i64 {
    if amount_jpy <= 0 {
        return 0;
    }
    // Integer division already floors for positive values.
    amount_jpy / 100 * CONSUMPTION_TAX_PERCENT
        + (amount_jpy % 100) * CONSUMPTION_TAX_PERCENT / 100
}

/// Fraction of consumption tax a recipient may deduct for an invoice issued
/// on `issue_date`.
#[must_use]
pub fn deductible_rate(registered: bool, issue_date: Date) -> Decimal {
    if registered || issue_date < INVOICE_SYSTEM_START {
        Decimal::ONE
    } else if issue_date < TRANSITION_HALF_START {
        Decimal::new(80, 2)
    } else if issue_date < TRANSITION_END {
        Decimal::new(50, 2)
    } else {
        Decimal::ZERO
    }
}

/// Totals printed on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub commission_total_jpy: i64,
    pub refund_total_jpy: i64,
    /// Commission less refunds, never below zero.
    pub subtotal_jpy: i64,
    /// Refund amount that could not be offset against this invoice.
    pub refund_carryover_jpy: i64,
    pub tax_jpy: i64,
    pub total_jpy: i64,
    pub deductible_rate: Decimal,
    pub deductible_tax_jpy: i64,
}

impl InvoiceTotals {
    /// Computes invoice totals.
    ///
    /// # Errors
    ///
    /// Returns an error if either input is negative or a sum overflows.
    pub fn compute(
        commission_total_jpy: i64,
        refund_total_jpy: i64,
        registered: bool,
        issue_date: Date,
    ) -> Result<Self, DomainError> {
        if commission_total_jpy < 0 {
            return Err(DomainError::NegativeAmount {
                field: String::from("commission_total_jpy"),
                value: commission_total_jpy.to_string(),
            });
        }
        if refund_total_jpy < 0 {
            return Err(DomainError::NegativeAmount {
                field: String::from("refund_total_jpy"),
                value: refund_total_jpy.to_string(),
            });
        }

        let net = commission_total_jpy - refund_total_jpy;
        let (subtotal_jpy, refund_carryover_jpy) = if net < 0 { (0, -net) } else { (net, 0) };
        let tax_jpy = consumption_tax(subtotal_jpy);
        let total_jpy = subtotal_jpy
            .checked_add(tax_jpy)
            .ok_or_else(|| DomainError::AmountOverflow {
                operation: String::from("adding consumption tax"),
            })?;
        let rate = deductible_rate(registered, issue_date);
        let deductible_tax_jpy = to_yen(
            Decimal::from(tax_jpy) * rate,
            "computing deductible tax",
        )?;

        Ok(Self {
            commission_total_jpy,
            refund_total_jpy,
            subtotal_jpy,
            refund_carryover_jpy,
            tax_jpy,
            total_jpy,
            deductible_rate: rate,
            deductible_tax_jpy,
        })
    }
}

/// Yen figures for one report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardLine {
    pub reward_jpy: i64,
    pub commission_jpy: i64,
}

impl RewardLine {
    /// Converts a USD reward and applies the agency commission.
    ///
    /// # Errors
    ///
    /// Returns an error if the reward is negative or a product overflows.
    pub fn compute(
        reward_usd: Decimal,
        exchange_rate: ExchangeRate,
        commission_rate: CommissionRate,
    ) -> Result<Self, DomainError> {
        let reward_jpy = usd_to_jpy(reward_usd, exchange_rate)?;
        let commission_jpy = commission_jpy(reward_jpy, commission_rate)?;
        Ok(Self {
            reward_jpy,
            commission_jpy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumption_tax_floors() {
        assert_eq!(consumption_tax(0), 0);
        assert_eq!(consumption_tax(9), 0);
        assert_eq!(consumption_tax(10), 1);
        assert_eq!(consumption_tax(199), 19);
        assert_eq!(consumption_tax(100_000), 10_000);
        assert_eq!(consumption_tax(-500), 0);
    }

    #[test]
    fn test_deductible_rate_schedule() {
        assert_eq!(deductible_rate(true, date!(2030 - 01 - 01)), Decimal::ONE);
        assert_eq!(deductible_rate(false, date!(2023 - 09 - 30)), Decimal::ONE);
        assert_eq!(
            deductible_rate(false, date!(2023 - 10 - 01)),
            Decimal::new(80, 2)
        );
        assert_eq!(
            deductible_rate(false, date!(2026 - 09 - 30)),
            Decimal::new(80, 2)
        );
        assert_eq!(
            deductible_rate(false, date!(2026 - 10 - 01)),
            Decimal::new(50, 2)
        );
        assert_eq!(
            deductible_rate(false, date!(2029 - 09 - 30)),
            Decimal::new(50, 2)
        );
        assert_eq!(deductible_rate(false, date!(2029 - 10 - 01)), Decimal::ZERO);
    }
}
