// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! These types are the JSON contract of the service. They are built from
//! persistence records explicitly so storage changes never leak into the
//! wire format.

use std::collections::BTreeMap;

use liverdesk_audit::AuditEvent;
use liverdesk_domain::Decimal;
use liverdesk_persistence::{
    AgencyData, ApplicationData, AuditEventRecord, BankDetails, ExchangeRateLogData, InvoiceData,
    LiverData, OperatorData, RefundData, ReportData, ReportRowData,
};

// ============================================================================
// Capabilities
// ============================================================================

/// Whether an action is permitted.
///
/// Serialized as a plain boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The action is permitted.
    Allowed,
    /// The action is not permitted.
    Denied,
}

impl Capability {
    /// Returns true if the capability is allowed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Creates a capability from a boolean value.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::Allowed } else { Self::Denied }
    }
}

impl serde::Serialize for Capability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bool(self.is_allowed())
    }
}

impl<'de> serde::Deserialize<'de> for Capability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let b = bool::deserialize(deserializer)?;
        Ok(Self::from_bool(b))
    }
}

/// What the logged-in operator may do, for UI gating.
///
/// Advisory only; every handler repeats its own authorization check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Capabilities {
    pub can_manage_agencies: Capability,
    pub can_manage_operators: Capability,
    pub can_manage_livers: Capability,
    pub can_import_reports: Capability,
    pub can_issue_invoices: Capability,
    pub can_review_applications: Capability,
    pub can_view_audit_log: Capability,
    /// The operator must change their password before doing anything else.
    pub must_change_password: bool,
}

/// What the caller may do to one listed operator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperatorCapabilities {
    pub can_disable: Capability,
    pub can_enable: Capability,
}

// ============================================================================
// Authentication and operators
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoginRequest {
    pub login_name: String,
    pub password: String,
}

/// Operator fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperatorInfo {
    pub operator_id: i64,
    pub login_name: String,
    pub display_name: String,
    pub role: String,
    pub agency_id: Option<i64>,
    pub is_disabled: bool,
    pub must_change_password: bool,
    pub created_at: String,
    pub disabled_at: Option<String>,
    pub last_login_at: Option<String>,
}

impl From<&OperatorData> for OperatorInfo {
    fn from(operator: &OperatorData) -> Self {
        Self {
            operator_id: operator.operator_id,
            login_name: operator.login_name.clone(),
            display_name: operator.display_name.clone(),
            role: operator.role.clone(),
            agency_id: operator.agency_id,
            is_disabled: operator.is_disabled,
            must_change_password: operator.must_change_password,
            created_at: operator.created_at.clone(),
            disabled_at: operator.disabled_at.clone(),
            last_login_at: operator.last_login_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub operator: OperatorInfo,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WhoAmIResponse {
    pub operator: OperatorInfo,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// A bare acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateOperatorRequest {
    pub login_name: String,
    pub display_name: String,
    pub password: String,
    pub password_confirmation: String,
    /// `Admin` or `Agency`.
    pub role: String,
    /// Required for `Agency` operators.
    pub agency_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateOperatorResponse {
    pub operator: OperatorInfo,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperatorListEntry {
    #[serde(flatten)]
    pub operator: OperatorInfo,
    pub capabilities: OperatorCapabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListOperatorsResponse {
    pub operators: Vec<OperatorListEntry>,
}

// ============================================================================
// Agencies
// ============================================================================

/// Agency fields accepted on create and update.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgencyFields {
    pub name: String,
    pub code: String,
    /// Percentage as a decimal string, e.g. `"20"` or `"12.5"`.
    pub commission_rate: String,
    /// One of `S`, `A`, `B`, `C`, `D`.
    pub rank: String,
    #[serde(default)]
    pub parent_agency_id: Option<i64>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub bank: BankDetails,
    /// `T` followed by 13 digits, when the agency is a registered issuer.
    #[serde(default)]
    pub invoice_registration_number: Option<String>,
}

/// Login to provision together with a new agency.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgencyLoginRequest {
    pub login_name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateAgencyRequest {
    #[serde(flatten)]
    pub agency: AgencyFields,
    #[serde(default)]
    pub login: Option<AgencyLoginRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgencyInfo {
    pub agency_id: i64,
    pub name: String,
    pub code: String,
    pub commission_rate: Decimal,
    pub rank: String,
    pub parent_agency_id: Option<i64>,
    pub contact_email: Option<String>,
    pub bank: BankDetails,
    pub invoice_registration_number: Option<String>,
    pub is_invoice_registered: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AgencyData> for AgencyInfo {
    fn from(agency: AgencyData) -> Self {
        Self {
            agency_id: agency.agency_id,
            name: agency.name,
            code: agency.code,
            commission_rate: agency.commission_rate.percent(),
            rank: agency.rank.as_str().to_string(),
            parent_agency_id: agency.parent_agency_id,
            contact_email: agency.contact_email,
            bank: agency.bank,
            invoice_registration_number: agency.invoice_registration_number,
            is_invoice_registered: agency.is_invoice_registered,
            created_at: agency.created_at,
            updated_at: agency.updated_at,
        }
    }
}

/// Credentials of a login created alongside an agency.
///
/// The temporary password is returned exactly once.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProvisionedLogin {
    pub operator_id: i64,
    pub login_name: String,
    pub temporary_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateAgencyResponse {
    pub agency: AgencyInfo,
    pub login: Option<ProvisionedLogin>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListAgenciesResponse {
    pub agencies: Vec<AgencyInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeleteAgencyResponse {
    pub agency_id: i64,
    /// Operators that lost their agency and were disabled.
    pub detached_operator_ids: Vec<i64>,
    pub message: String,
}

// ============================================================================
// Livers
// ============================================================================

/// Liver fields accepted on create and update.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LiverFields {
    pub tiktok_handle: String,
    pub display_name: String,
    #[serde(default)]
    pub tiktok_user_id: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Defaults to `active` on create.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub agency_id: Option<i64>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LiverInfo {
    pub liver_id: i64,
    pub tiktok_user_id: Option<String>,
    pub tiktok_handle: String,
    pub display_name: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub agency_id: Option<i64>,
    pub joined_at: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LiverData> for LiverInfo {
    fn from(liver: LiverData) -> Self {
        Self {
            liver_id: liver.liver_id,
            tiktok_user_id: liver.tiktok_user_id,
            tiktok_handle: liver.tiktok_handle,
            display_name: liver.display_name,
            real_name: liver.real_name,
            email: liver.email,
            status: liver.status.as_str().to_string(),
            agency_id: liver.agency_id,
            joined_at: liver.joined_at,
            notes: liver.notes,
            created_at: liver.created_at,
            updated_at: liver.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListLiversQuery {
    pub agency_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListLiversResponse {
    pub livers: Vec<LiverInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BulkLiverStatusRequest {
    pub liver_ids: Vec<i64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BulkLiverStatusResponse {
    pub updated: usize,
}

// ============================================================================
// Applications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubmitApplicationRequest {
    /// One of the eight form types, e.g. `liver_registration`.
    pub form_type: String,
    pub applicant_name: String,
    #[serde(default)]
    pub applicant_email: Option<String>,
    #[serde(default)]
    pub tiktok_handle: Option<String>,
    #[serde(default)]
    pub tiktok_user_id: Option<String>,
    /// Ignored for agency operators, whose own agency is used.
    #[serde(default)]
    pub agency_id: Option<i64>,
    /// Free-form answers of the form.
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApplicationInfo {
    pub application_id: i64,
    pub form_type: String,
    pub status: String,
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

impl From<ApplicationData> for ApplicationInfo {
    fn from(app: ApplicationData) -> Self {
        Self {
            application_id: app.application_id,
            form_type: app.form_type.as_str().to_string(),
            status: app.status.as_str().to_string(),
            applicant_name: app.applicant_name,
            applicant_email: app.applicant_email,
            tiktok_handle: app.tiktok_handle,
            tiktok_user_id: app.tiktok_user_id,
            agency_id: app.agency_id,
            payload: app.payload,
            liver_id: app.liver_id,
            submitted_by: app.submitted_by,
            reviewer_operator_id: app.reviewer_operator_id,
            review_note: app.review_note,
            version: app.version,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListApplicationsQuery {
    pub form_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListApplicationsResponse {
    pub applications: Vec<ApplicationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransitionApplicationRequest {
    /// The version the reviewer read.
    pub expected_version: i32,
    /// Target status, e.g. `authorized`.
    pub to: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransitionApplicationResponse {
    pub application: ApplicationInfo,
    /// Liver created by authorizing a registration.
    pub created_liver_id: Option<i64>,
}

// ============================================================================
// Reports
// ============================================================================

/// A CSV upload, used for both preview and import.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReportImportRequest {
    /// The CSV file contents.
    pub csv: String,
    #[serde(default)]
    pub source_filename: Option<String>,
    /// Overrides any month found in the file.
    #[serde(default)]
    pub data_month: Option<String>,
    /// JPY per USD as a decimal string.
    pub exchange_rate: String,
    #[serde(default)]
    pub revenue_task: Option<String>,
    /// Replace an existing report for the same month.
    #[serde(default)]
    pub replace_existing: bool,
}

/// One parsed row as it would be stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreviewRow {
    pub creator_id: Option<String>,
    pub creator_handle: Option<String>,
    pub creator_name: Option<String>,
    pub diamonds: i64,
    pub reward_usd: Decimal,
    pub reward_jpy: i64,
    pub commission_rate: Decimal,
    pub commission_jpy: i64,
    pub liver_id: Option<i64>,
    pub agency_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImportPreviewResponse {
    pub data_month: String,
    pub exchange_rate: Decimal,
    /// Id of the report that already covers the month, if any.
    pub month_collision: Option<i64>,
    /// Logical column name to the header it was matched to.
    pub matched_columns: BTreeMap<String, String>,
    pub rows: Vec<PreviewRow>,
    pub warnings: Vec<String>,
    pub unmatched_rows: usize,
    pub total_reward_usd: Decimal,
    pub total_reward_jpy: i64,
    pub total_commission_jpy: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImportReportResponse {
    pub report_id: i64,
    pub data_month: String,
    pub rows_inserted: usize,
    pub replaced_report_id: Option<i64>,
    pub refunds_migrated: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReportInfo {
    pub report_id: i64,
    pub data_month: String,
    pub exchange_rate: Decimal,
    pub revenue_task: Option<String>,
    pub source_filename: Option<String>,
    pub row_count: i32,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ReportData> for ReportInfo {
    fn from(report: ReportData) -> Self {
        Self {
            report_id: report.report_id,
            data_month: report.data_month.to_string(),
            exchange_rate: report.exchange_rate.value(),
            revenue_task: report.revenue_task,
            source_filename: report.source_filename,
            row_count: report.row_count,
            created_by: report.created_by,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReportRowInfo {
    pub row_id: i64,
    pub agency_id: Option<i64>,
    pub liver_id: Option<i64>,
    pub creator_id: Option<String>,
    pub creator_handle: Option<String>,
    pub creator_name: Option<String>,
    pub diamonds: i64,
    pub reward_usd: Decimal,
    pub reward_jpy: i64,
    pub commission_rate: Decimal,
    pub commission_jpy: i64,
}

impl From<ReportRowData> for ReportRowInfo {
    fn from(row: ReportRowData) -> Self {
        Self {
            row_id: row.row_id,
            agency_id: row.agency_id,
            liver_id: row.liver_id,
            creator_id: row.creator_id,
            creator_handle: row.creator_handle,
            creator_name: row.creator_name,
            diamonds: row.diamonds,
            reward_usd: row.reward_usd,
            reward_jpy: row.reward_jpy,
            commission_rate: row.commission_rate.percent(),
            commission_jpy: row.commission_jpy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListReportsResponse {
    pub reports: Vec<ReportInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReportDetailResponse {
    pub report: ReportInfo,
    /// Rows visible to the caller.
    pub rows: Vec<ReportRowInfo>,
    pub total_reward_jpy: i64,
    pub total_commission_jpy: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecalculateExchangeRateRequest {
    pub exchange_rate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecalculateExchangeRateResponse {
    pub report_id: i64,
    pub old_rate: Decimal,
    pub new_rate: Decimal,
    pub rows_recalculated: usize,
    pub refunds_recalculated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExchangeRateLogInfo {
    pub log_id: i64,
    pub old_rate: Decimal,
    pub new_rate: Decimal,
    pub rows_recalculated: i32,
    pub refunds_recalculated: i32,
    pub changed_by: i64,
    pub changed_at: String,
}

impl From<ExchangeRateLogData> for ExchangeRateLogInfo {
    fn from(log: ExchangeRateLogData) -> Self {
        Self {
            log_id: log.log_id,
            old_rate: log.old_rate.value(),
            new_rate: log.new_rate.value(),
            rows_recalculated: log.rows_recalculated,
            refunds_recalculated: log.refunds_recalculated,
            changed_by: log.changed_by,
            changed_at: log.changed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListExchangeRateLogsResponse {
    pub logs: Vec<ExchangeRateLogInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateRefundRequest {
    #[serde(default)]
    pub liver_id: Option<i64>,
    /// Defaults to the liver's agency.
    #[serde(default)]
    pub agency_id: Option<i64>,
    /// USD as a decimal string.
    pub amount_usd: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RefundInfo {
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

impl From<RefundData> for RefundInfo {
    fn from(refund: RefundData) -> Self {
        Self {
            refund_id: refund.refund_id,
            report_id: refund.report_id,
            liver_id: refund.liver_id,
            agency_id: refund.agency_id,
            amount_usd: refund.amount_usd,
            amount_jpy: refund.amount_jpy,
            reason: refund.reason,
            created_by: refund.created_by,
            created_at: refund.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListRefundsResponse {
    pub refunds: Vec<RefundInfo>,
}

// ============================================================================
// Invoices
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateInvoiceRequest {
    pub report_id: i64,
    pub agency_id: i64,
    /// `YYYY-MM-DD`; today in Japan when absent.
    #[serde(default)]
    pub issue_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateInvoicesRequest {
    /// `YYYY-MM-DD`; today in Japan when absent.
    #[serde(default)]
    pub issue_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InvoiceInfo {
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

impl From<InvoiceData> for InvoiceInfo {
    fn from(invoice: InvoiceData) -> Self {
        Self {
            invoice_id: invoice.invoice_id,
            invoice_number: invoice.invoice_number,
            agency_id: invoice.agency_id,
            report_id: invoice.report_id,
            issue_date: invoice.issue_date,
            commission_total_jpy: invoice.commission_total_jpy,
            refund_total_jpy: invoice.refund_total_jpy,
            subtotal_jpy: invoice.subtotal_jpy,
            refund_carryover_jpy: invoice.refund_carryover_jpy,
            tax_jpy: invoice.tax_jpy,
            total_jpy: invoice.total_jpy,
            deductible_rate: invoice.deductible_rate,
            deductible_tax_jpy: invoice.deductible_tax_jpy,
            agency_name: invoice.agency_name,
            is_invoice_registered: invoice.is_invoice_registered,
            invoice_registration_number: invoice.invoice_registration_number,
            bank: invoice.bank,
            created_by: invoice.created_by,
            created_at: invoice.created_at,
        }
    }
}

/// An agency left out of bulk generation, and why.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SkippedInvoice {
    pub agency_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateInvoicesResponse {
    pub generated: Vec<InvoiceInfo>,
    pub skipped: Vec<SkippedInvoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListInvoicesQuery {
    pub report_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<InvoiceInfo>,
}

/// A rendered invoice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListAuditEventsQuery {
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuditEventInfo {
    pub event_id: i64,
    pub event: AuditEvent,
    pub created_at: String,
}

impl From<AuditEventRecord> for AuditEventInfo {
    fn from(record: AuditEventRecord) -> Self {
        Self {
            event_id: record.event_id,
            event: record.event,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ListAuditEventsResponse {
    pub events: Vec<AuditEventInfo>,
}
