// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Sequential invoice numbering: `INV-YYYYMM-NNNN`.

use crate::types::DataMonth;

pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Formats an invoice number for `month` and a 1-based `sequence`.
#[must_use]
pub fn format_invoice_number(month: DataMonth, sequence: u32) -> String {
    format!("{INVOICE_NUMBER_PREFIX}-{}-{sequence:04}", month.compact())
}

/// Extracts the sequence from `number` if it belongs to `month`.
#[must_use]
pub fn parse_sequence(number: &str, month: DataMonth) -> Option<u32> {
    let rest = number.strip_prefix(INVOICE_NUMBER_PREFIX)?.strip_prefix('-')?;
    let (compact, sequence) = rest.split_once('-')?;
    if compact != month.compact() {
        return None;
    }
    if sequence.len() < 4 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    sequence.parse::<u32>().ok().filter(|seq| *seq > 0)
}

/// Returns the next free invoice number for `month`.
///
/// Numbers that belong to other months or are malformed are ignored.
#[must_use]
pub fn next_invoice_number(month: DataMonth, existing: &[String]) -> String {
    let highest = existing
        .iter()
        .filter_map(|number| parse_sequence(number, month))
        .max()
        .unwrap_or(0);
    format_invoice_number(month, highest.saturating_add(1))
}
