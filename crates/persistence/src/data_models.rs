// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Records returned by and passed into the persistence layer.

use liverdesk_domain::{
    AgencyRank, ApplicationFormType, ApplicationStatus, CommissionRate, DataMonth, Decimal,
    ExchangeRate, LiverStatus,
};
use serde::{Deserialize, Serialize};

/// Stored operator account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorData {
    pub operator_id: i64,
    pub login_name: String,
    pub display_name: String,
    pub password_hash: String,
    /// `Admin` or `Agency`.
    pub role: String,
    pub agency_id: Option<i64>,
    pub is_disabled: bool,
    pub must_change_password: bool,
    pub created_at: String,
    pub disabled_at: Option<String>,
    pub last_login_at: Option<String>,
}

/// Stored login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub session_id: i64,
    pub session_token: String,
    pub operator_id: i64,
    pub created_at: String,
    pub last_activity_at: String,
    pub expires_at: String,
}

/// Payout bank details, copied onto invoices when they are issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_account_type: Option<String>,
    pub bank_account_number: Option<String>,
    pub bank_account_holder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencyData {
    pub agency_id: i64,
    pub name: String,
    pub code: String,
    pub commission_rate: CommissionRate,
    pub rank: AgencyRank,
    pub parent_agency_id: Option<i64>,
    pub contact_email: Option<String>,
    pub bank: BankDetails,
    pub invoice_registration_number: Option<String>,
    pub is_invoice_registered: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new agency. Validation happens before this is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgency {
    pub name: String,
    pub code: String,
    pub commission_rate: CommissionRate,
    pub rank: AgencyRank,
    pub parent_agency_id: Option<i64>,
    pub contact_email: Option<String>,
    pub bank: BankDetails,
    pub invoice_registration_number: Option<String>,
}

/// Full replacement of an agency's editable fields.
pub type AgencyUpdate = NewAgency;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiverData {
    pub liver_id: i64,
    pub tiktok_user_id: Option<String>,
    pub tiktok_handle: String,
    pub display_name: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status: LiverStatus,
    pub agency_id: Option<i64>,
    pub joined_at: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLiver {
    pub tiktok_user_id: Option<String>,
    pub tiktok_handle: String,
    pub display_name: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status: LiverStatus,
    pub agency_id: Option<i64>,
    pub joined_at: Option<String>,
    pub notes: Option<String>,
}

/// Full replacement of a liver's editable fields.
pub type LiverUpdate = NewLiver;

/// Filter for liver listings. `None` means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiverFilter {
    pub agency_ids: Option<Vec<i64>>,
    pub status: Option<LiverStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationData {
    pub application_id: i64,
    pub form_type: ApplicationFormType,
    pub status: ApplicationStatus,
    pub applicant_name: String,
    pub applicant_email: Option<String>,
    pub tiktok_handle: Option<String>,
    pub tiktok_user_id: Option<String>,
    pub agency_id: Option<i64>,
    pub payload: serde_json::Value,
    pub liver_id: Option<i64>,
    pub submitted_by: Option<i64>,
    pub reviewer_operator_id: Option<i64>,
    pub review_note: Option<String>,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub form_type: ApplicationFormType,
    pub applicant_name: String,
    pub applicant_email: Option<String>,
    pub tiktok_handle: Option<String>,
    pub tiktok_user_id: Option<String>,
    pub agency_id: Option<i64>,
    pub payload: serde_json::Value,
    pub submitted_by: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub form_type: Option<ApplicationFormType>,
    pub status: Option<ApplicationStatus>,
    pub agency_ids: Option<Vec<i64>>,
}

/// A status change guarded by the version the caller last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationTransition {
    pub application_id: i64,
    pub expected_version: i32,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub reviewer_operator_id: i64,
    pub review_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportData {
    pub report_id: i64,
    pub data_month: DataMonth,
    pub exchange_rate: ExchangeRate,
    pub revenue_task: Option<String>,
    pub source_filename: Option<String>,
    pub row_count: i32,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub data_month: DataMonth,
    pub exchange_rate: ExchangeRate,
    pub revenue_task: Option<String>,
    pub source_filename: Option<String>,
    pub created_by: i64,
}

/// One computed row ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReportRow {
    pub agency_id: Option<i64>,
    pub liver_id: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_handle: Option<String>,
    pub creator_name: Option<String>,
    pub diamonds: i64,
    pub reward_usd: Decimal,
    pub reward_jpy: i64,
    pub commission_rate: CommissionRate,
    pub commission_jpy: i64,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRowData {
    pub row_id: i64,
    pub report_id: i64,
    pub agency_id: Option<i64>,
    pub liver_id: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_handle: Option<String>,
    pub creator_name: Option<String>,
    pub diamonds: i64,
    pub reward_usd: Decimal,
    pub reward_jpy: i64,
    pub commission_rate: CommissionRate,
    pub commission_jpy: i64,
}

/// Outcome of storing a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub report_id: i64,
    pub rows_inserted: usize,
    /// Report that was replaced, if any.
    pub replaced_report_id: Option<i64>,
    /// Refunds carried over from the replaced report.
    pub refunds_migrated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundData {
    pub refund_id: i64,
    pub report_id: i64,
    pub liver_id: Option<i64>,
    pub agency_id: Option<i64>,
    pub amount_usd: Decimal,
    pub amount_jpy: i64,
    pub reason: Option<String>,
    pub created_by: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefund {
    pub report_id: i64,
    pub liver_id: Option<i64>,
    pub agency_id: Option<i64>,
    pub amount_usd: Decimal,
    pub amount_jpy: i64,
    pub reason: Option<String>,
    pub created_by: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRateLogData {
    pub log_id: i64,
    pub report_id: i64,
    pub old_rate: ExchangeRate,
    pub new_rate: ExchangeRate,
    pub rows_recalculated: i32,
    pub refunds_recalculated: i32,
    pub changed_by: i64,
    pub changed_at: String,
}

/// Outcome of an exchange-rate recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecalculationSummary {
    pub report_id: i64,
    pub old_rate: ExchangeRate,
    pub new_rate: ExchangeRate,
    pub rows_recalculated: usize,
    pub refunds_recalculated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceData {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub agency_id: i64,
    pub report_id: i64,
    pub issue_date: String,
    pub commission_total_jpy: i64,
    pub refund_total_jpy: i64,
    pub subtotal_jpy: i64,
    pub refund_carryover_jpy: i64,
    pub tax_jpy: i64,
    pub total_jpy: i64,
    pub deductible_rate: Decimal,
    pub deductible_tax_jpy: i64,
    pub agency_name: String,
    pub is_invoice_registered: bool,
    pub invoice_registration_number: Option<String>,
    pub bank: BankDetails,
    pub created_by: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub agency_id: i64,
    pub report_id: i64,
    pub issue_date: String,
    pub commission_total_jpy: i64,
    pub refund_total_jpy: i64,
    pub subtotal_jpy: i64,
    pub refund_carryover_jpy: i64,
    pub tax_jpy: i64,
    pub total_jpy: i64,
    pub deductible_rate: Decimal,
    pub deductible_tax_jpy: i64,
    pub agency_name: String,
    pub is_invoice_registered: bool,
    pub invoice_registration_number: Option<String>,
    pub bank: BankDetails,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub report_id: Option<i64>,
    pub agency_ids: Option<Vec<i64>>,
}

/// Stored audit event together with its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEventRecord {
    pub event_id: i64,
    pub event: liverdesk_audit::AuditEvent,
    pub created_at: String,
}
