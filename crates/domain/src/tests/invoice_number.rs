// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{DataMonth, format_invoice_number, next_invoice_number, parse_sequence};

#[test]
fn test_format_is_zero_padded() {
    let month = DataMonth::new(2024, 5).unwrap();
    assert_eq!(format_invoice_number(month, 7), "INV-202405-0007");
}

#[test]
fn test_first_number_of_month() {
    let month = DataMonth::new(2024, 5).unwrap();
    assert_eq!(next_invoice_number(month, &[]), "INV-202405-0001");
}

#[test]
fn test_next_number_ignores_other_months_and_garbage() {
    let month = DataMonth::new(2024, 5).unwrap();
    let existing = vec![
        String::from("INV-202405-0001"),
        String::from("INV-202405-0003"),
        String::from("INV-202404-0009"),
        String::from("INV-202405-abcd"),
        String::from("draft"),
    ];
    assert_eq!(next_invoice_number(month, &existing), "INV-202405-0004");
}

#[test]
fn test_parse_sequence() {
    let month = DataMonth::new(2024, 5).unwrap();
    assert_eq!(parse_sequence("INV-202405-0042", month), Some(42));
    assert_eq!(parse_sequence("INV-202405-12345", month), Some(12345));
    assert_eq!(parse_sequence("INV-202405-0000", month), None);
    assert_eq!(parse_sequence("INV-202405-42", month), None);
    assert_eq!(parse_sequence("INV-202406-0042", month), None);
}
