// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! A4 invoice documents.
//!
//! Given a TrueType font (for example Noto Sans JP), every text is written
//! as is with that font. Without one the PDF built-in Helvetica faces are
//! used, which only cover Latin text, so characters outside printable ASCII
//! are replaced.

use std::borrow::Cow;

use liverdesk_domain::{CONSUMPTION_TAX_PERCENT, Decimal};
use liverdesk_persistence::{AgencyData, InvoiceData, ReportData};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::ApiError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MM: f32 = 20.0;
const AMOUNT_COLUMN_MM: f32 = 140.0;
const LINE_MM: f32 = 7.0;

/// Formats yen with thousands separators, e.g. `JPY 1,234,567`.
#[must_use]
pub fn format_yen(amount: i64) -> String {
    let digits: String = amount.unsigned_abs().to_string();
    let mut grouped: String = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("JPY -{grouped}")
    } else {
        format!("JPY {grouped}")
    }
}

/// Formats a fraction such as `0.80` as `80%`.
fn format_percent(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).normalize())
}

/// Text as the chosen fonts can draw it. The built-in faces only get
/// printable ASCII; everything else becomes `?`.
fn printable(text: &str, unicode: bool) -> Cow<'_, str> {
    if unicode {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
            .collect(),
    )
}

/// Writes lines top to bottom.
struct Cursor<'a> {
    layer: &'a PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    unicode: bool,
    y: f32,
}

impl Cursor<'_> {
    fn text(&mut self, text: &str, size: f32, bold: bool) {
        let font: &IndirectFontRef = if bold { self.bold } else { self.regular };
        self.layer
            .use_text(printable(text, self.unicode), size, Mm(LEFT_MM), Mm(self.y), font);
        self.y -= LINE_MM;
    }

    fn amount(&mut self, label: &str, amount: i64, bold: bool) {
        let font: &IndirectFontRef = if bold { self.bold } else { self.regular };
        self.layer
            .use_text(printable(label, self.unicode), 11.0, Mm(LEFT_MM), Mm(self.y), font);
        self.layer
            .use_text(format_yen(amount), 11.0, Mm(AMOUNT_COLUMN_MM), Mm(self.y), font);
        self.y -= LINE_MM;
    }

    fn gap(&mut self) {
        self.y -= LINE_MM / 2.0;
    }
}

fn pdf_error(err: &printpdf::Error) -> ApiError {
    ApiError::Internal {
        message: format!("Failed to render invoice PDF: {err}"),
    }
}

/// Renders an invoice as an A4 PDF.
///
/// Amounts, issuer details and bank details come from the invoice's own
/// snapshot so a later agency edit does not change an issued document.
/// `font` is a TrueType font embedded for all text; `None` falls back to
/// the built-in faces.
///
/// # Errors
///
/// Returns an internal error if the font cannot be embedded or the
/// document cannot be produced.
pub fn render_invoice_pdf(
    invoice: &InvoiceData,
    agency: &AgencyData,
    report: &ReportData,
    font: Option<&[u8]>,
) -> Result<Vec<u8>, ApiError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", invoice.invoice_number),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Invoice",
    );
    let (regular, bold): (IndirectFontRef, IndirectFontRef) = match font {
        Some(bytes) => {
            // One face for both weights; headings are told apart by size.
            let embedded: IndirectFontRef =
                doc.add_external_font(bytes).map_err(|e| pdf_error(&e))?;
            (embedded.clone(), embedded)
        }
        None => (
            doc.add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| pdf_error(&e))?,
            doc.add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| pdf_error(&e))?,
        ),
    };
    let layer: PdfLayerReference = doc.get_page(page).get_layer(layer);

    let mut cursor = Cursor {
        layer: &layer,
        regular: &regular,
        bold: &bold,
        unicode: font.is_some(),
        y: PAGE_HEIGHT_MM - 25.0,
    };

    cursor.text("INVOICE", 22.0, true);
    cursor.gap();
    cursor.text(&format!("Invoice number: {}", invoice.invoice_number), 11.0, false);
    cursor.text(&format!("Issue date: {}", invoice.issue_date), 11.0, false);
    cursor.text(&format!("Data month: {}", report.data_month), 11.0, false);
    cursor.text(
        &format!("Exchange rate: {} JPY/USD", report.exchange_rate),
        11.0,
        false,
    );
    cursor.gap();

    cursor.text("Issuer", 13.0, true);
    cursor.text(
        &format!("{} ({})", invoice.agency_name, agency.code),
        11.0,
        false,
    );
    match &invoice.invoice_registration_number {
        Some(number) if invoice.is_invoice_registered => {
            cursor.text(&format!("Registration number: {number}"), 11.0, false);
        }
        _ => cursor.text("Not a registered invoice issuer", 11.0, false),
    }
    if let Some(email) = &agency.contact_email {
        cursor.text(&format!("Contact: {email}"), 11.0, false);
    }
    cursor.gap();

    cursor.text("Details", 13.0, true);
    cursor.amount("Agency commission", invoice.commission_total_jpy, false);
    if invoice.refund_total_jpy > 0 {
        cursor.amount("Refund deduction", -invoice.refund_total_jpy, false);
    }
    cursor.amount("Subtotal", invoice.subtotal_jpy, false);
    cursor.amount(
        &format!("Consumption tax ({CONSUMPTION_TAX_PERCENT}%)"),
        invoice.tax_jpy,
        false,
    );
    cursor.amount("Total", invoice.total_jpy, true);
    if invoice.refund_carryover_jpy > 0 {
        cursor.amount(
            "Refund carried over to a later invoice",
            invoice.refund_carryover_jpy,
            false,
        );
    }
    cursor.gap();

    cursor.text(
        &format!(
            "Deductible input tax: {} of consumption tax",
            format_percent(invoice.deductible_rate)
        ),
        11.0,
        false,
    );
    cursor.amount("Deductible tax", invoice.deductible_tax_jpy, false);
    cursor.gap();

    cursor.text("Payment account", 13.0, true);
    let bank_lines = [
        ("Bank", &invoice.bank.bank_name),
        ("Branch", &invoice.bank.bank_branch),
        ("Account type", &invoice.bank.bank_account_type),
        ("Account number", &invoice.bank.bank_account_number),
        ("Account holder", &invoice.bank.bank_account_holder),
    ];
    for (label, value) in bank_lines {
        cursor.text(
            &format!("{label}: {}", value.as_deref().unwrap_or("-")),
            11.0,
            false,
        );
    }

    doc.save_to_bytes().map_err(|e| pdf_error(&e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use liverdesk_domain::{AgencyRank, CommissionRate, DataMonth, ExchangeRate};
    use liverdesk_persistence::BankDetails;
    use std::str::FromStr;

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0), "JPY 0");
        assert_eq!(format_yen(999), "JPY 999");
        assert_eq!(format_yen(1000), "JPY 1,000");
        assert_eq!(format_yen(1_234_567), "JPY 1,234,567");
        assert_eq!(format_yen(-45_000), "JPY -45,000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Decimal::new(80, 2)), "80%");
        assert_eq!(format_percent(Decimal::ONE), "100%");
        assert_eq!(format_percent(Decimal::ZERO), "0%");
    }

    #[test]
    fn test_printable_replaces_non_ascii() {
        assert_eq!(printable("Agency 株式会社", false), "Agency ????");
    }

    #[test]
    fn test_printable_keeps_text_for_embedded_font() {
        assert_eq!(printable("株式会社アルファ", true), "株式会社アルファ");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bank = BankDetails {
            bank_name: Some(String::from("Mizuho")),
            bank_branch: Some(String::from("Shibuya")),
            bank_account_type: Some(String::from("ordinary")),
            bank_account_number: Some(String::from("1234567")),
            bank_account_holder: Some(String::from("ALPHA LTD")),
        };
        let agency = AgencyData {
            agency_id: 1,
            name: String::from("Alpha"),
            code: String::from("ALPHA"),
            commission_rate: CommissionRate::from_str("20").unwrap(),
            rank: AgencyRank::A,
            parent_agency_id: None,
            contact_email: Some(String::from("ops@alpha.example")),
            bank: bank.clone(),
            invoice_registration_number: Some(String::from("T1234567890123")),
            is_invoice_registered: true,
            created_at: String::from("2024-06-01 00:00:00"),
            updated_at: String::from("2024-06-01 00:00:00"),
        };
        let report = ReportData {
            report_id: 3,
            data_month: DataMonth::new(2024, 5).unwrap(),
            exchange_rate: ExchangeRate::from_str("150").unwrap(),
            revenue_task: None,
            source_filename: None,
            row_count: 2,
            created_by: 1,
            created_at: String::from("2024-06-01 00:00:00"),
            updated_at: String::from("2024-06-01 00:00:00"),
        };
        let invoice = InvoiceData {
            invoice_id: 9,
            invoice_number: String::from("INV-202405-0001"),
            agency_id: 1,
            report_id: 3,
            issue_date: String::from("2024-06-10"),
            commission_total_jpy: 100_000,
            refund_total_jpy: 1_000,
            subtotal_jpy: 99_000,
            refund_carryover_jpy: 0,
            tax_jpy: 9_900,
            total_jpy: 108_900,
            deductible_rate: Decimal::ONE,
            deductible_tax_jpy: 9_900,
            agency_name: String::from("Alpha"),
            is_invoice_registered: true,
            invoice_registration_number: Some(String::from("T1234567890123")),
            bank,
            created_by: 1,
            created_at: String::from("2024-06-10 00:00:00"),
        };

        let bytes = render_invoice_pdf(&invoice, &agency, &report, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
