// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used
)]

//! The API boundary of `LiverDesk`.
//!
//! This crate owns authentication, authorization, request validation and
//! the translation of domain and persistence errors into API errors. It is
//! transport-agnostic: the server crate maps these handlers onto HTTP.

mod auth;
mod capabilities;
mod csv_import;
mod error;
pub mod handlers;
mod invoice_pdf;
mod password_policy;
mod request_response;

#[cfg(test)]
mod tests;

pub use auth::{
    AgencyScope, AuthenticatedActor, AuthenticationService, AuthorizationService, Role,
};
pub use capabilities::{compute_capabilities, compute_operator_capabilities};
pub use csv_import::{
    Column, CsvImportError, FUZZY_MATCH_THRESHOLD, HeaderMap, ParsedReport, ParsedRow,
    import_report, match_headers, normalize_header, parse_report_csv, preview_report_import,
};
pub use error::{ApiError, AuthError, translate_domain_error, translate_persistence_error};
pub use invoice_pdf::{format_yen, render_invoice_pdf};
pub use password_policy::{
    PasswordPolicy, PasswordPolicyError, TEMPORARY_PASSWORD_LENGTH, generate_temporary_password,
};
pub use request_response::{
    AgencyFields, AgencyInfo, AgencyLoginRequest, ApplicationInfo, AuditEventInfo,
    BulkLiverStatusRequest, BulkLiverStatusResponse, Capabilities, Capability,
    ChangePasswordRequest, CreateAgencyRequest, CreateAgencyResponse, CreateOperatorRequest,
    CreateOperatorResponse, CreateRefundRequest, DeleteAgencyResponse, ExchangeRateLogInfo,
    GenerateInvoiceRequest, GenerateInvoicesRequest, GenerateInvoicesResponse,
    ImportPreviewResponse, ImportReportResponse, InvoiceInfo, InvoicePdf, ListAgenciesResponse,
    ListApplicationsQuery, ListApplicationsResponse, ListAuditEventsQuery, ListAuditEventsResponse,
    ListExchangeRateLogsResponse, ListInvoicesQuery, ListInvoicesResponse, ListLiversQuery,
    ListLiversResponse, ListOperatorsResponse, ListRefundsResponse, ListReportsResponse,
    LiverFields, LiverInfo, LoginRequest, LoginResponse, MessageResponse, OperatorCapabilities,
    OperatorInfo, OperatorListEntry, PreviewRow, ProvisionedLogin, RecalculateExchangeRateRequest,
    RecalculateExchangeRateResponse, RefundInfo, ReportDetailResponse, ReportImportRequest,
    ReportInfo, ReportRowInfo, SkippedInvoice, SubmitApplicationRequest,
    TransitionApplicationRequest, TransitionApplicationResponse, WhoAmIResponse,
};
