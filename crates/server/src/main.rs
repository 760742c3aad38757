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
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod session;

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use liverdesk_api::{
    AgencyFields, AgencyInfo, ApiError, ApplicationInfo, AuthenticationService,
    BulkLiverStatusRequest, BulkLiverStatusResponse, ChangePasswordRequest, CreateAgencyRequest,
    CreateAgencyResponse, CreateOperatorRequest, CreateOperatorResponse, CreateRefundRequest,
    DeleteAgencyResponse, GenerateInvoiceRequest, GenerateInvoicesRequest,
    GenerateInvoicesResponse, ImportPreviewResponse, ImportReportResponse, InvoiceInfo, InvoicePdf,
    ListAgenciesResponse, ListApplicationsQuery, ListApplicationsResponse, ListAuditEventsQuery,
    ListAuditEventsResponse, ListExchangeRateLogsResponse, ListInvoicesQuery, ListInvoicesResponse,
    ListLiversQuery, ListLiversResponse, ListOperatorsResponse, ListRefundsResponse,
    ListReportsResponse, LiverFields, LiverInfo, LoginRequest, LoginResponse, MessageResponse,
    PasswordPolicy, RecalculateExchangeRateRequest, RecalculateExchangeRateResponse, RefundInfo,
    ReportDetailResponse, ReportImportRequest, SubmitApplicationRequest,
    TransitionApplicationRequest, TransitionApplicationResponse, WhoAmIResponse,
    handlers::{agencies, applications, audit, auth, invoices, livers, operators, reports},
    import_report, preview_report_import,
};
use liverdesk_audit::{Action, Actor, AuditEvent, Cause};
use liverdesk_persistence::{NewOperator, Persistence, PersistenceError, ROLE_ADMIN};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use session::{ActiveOperator, SessionOperator};

/// How often expired sessions are purged.
const SESSION_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Display name given to the bootstrap administrator.
const BOOTSTRAP_DISPLAY_NAME: &str = "Administrator";

/// `LiverDesk` Server - HTTP server for agency, liver and revenue management
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long, env = "LIVERDESK_DATABASE")]
    database: Option<String>,

    /// `MySQL`/`MariaDB` connection URL. Takes the place of `--database`.
    #[arg(long, env = "LIVERDESK_MYSQL_URL", conflicts_with = "database")]
    mysql_url: Option<String>,

    /// Address to bind the server to
    #[arg(long, env = "LIVERDESK_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to bind the server to
    #[arg(short, long, env = "LIVERDESK_PORT", default_value_t = 3000)]
    port: u16,

    /// Login name of the first administrator, created when no operators exist
    #[arg(long, env = "LIVERDESK_BOOTSTRAP_ADMIN", requires = "bootstrap_password")]
    bootstrap_admin: Option<String>,

    /// Password of the first administrator
    #[arg(long, env = "LIVERDESK_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    bootstrap_password: Option<String>,

    /// Session lifetime in days
    #[arg(
        long,
        env = "LIVERDESK_SESSION_DAYS",
        default_value_t = AuthenticationService::DEFAULT_SESSION_DAYS
    )]
    session_days: i64,

    /// TrueType font embedded in invoice PDFs, needed for Japanese text
    #[arg(long, env = "LIVERDESK_PDF_FONT")]
    pdf_font: Option<std::path::PathBuf>,
}

/// Application state shared across handlers.
///
/// The persistence layer is wrapped in a Mutex so handlers serialize their
/// access to the single database connection.
#[derive(Clone)]
pub struct AppState {
    /// The persistence layer.
    persistence: Arc<Mutex<Persistence>>,
    /// How long a new session stays valid.
    session_lifetime: time::Duration,
    /// Font embedded in invoice PDFs, if configured.
    pdf_font: Option<Arc<[u8]>>,
}

/// Path parameter for routes addressing a single record.
#[derive(Debug, Deserialize)]
struct IdPath {
    id: i64,
}

/// Response for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error indicator.
    pub error: bool,
    /// Error message.
    pub message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidInput { .. }
            | ApiError::InvalidCsvFormat { .. }
            | ApiError::PasswordPolicyViolation { .. } => StatusCode::BAD_REQUEST,
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_client_error() {
            warn!(status = status.as_u16(), error = %err, "Request rejected");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<PersistenceError> for HttpError {
    fn from(err: PersistenceError) -> Self {
        error!(error = %err, "Persistence error");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Persistence error: {err}"),
        }
    }
}

/// Builds the audit cause for a request made on a session.
fn request_cause(session: &SessionOperator, description: &str) -> Cause {
    let id: String = session.actor.session_id.map_or_else(
        || format!("operator-{}", session.actor.operator_id),
        |session_id| format!("session-{session_id}"),
    );
    Cause::new(id, description.to_string())
}

/// Creates the first administrator when the operator table is empty.
///
/// Returns the new operator id, or `None` when operators already exist.
///
/// # Errors
///
/// Returns an error if the password breaks the policy or the operator
/// cannot be stored.
fn bootstrap_admin(
    persistence: &mut Persistence,
    login_name: &str,
    password: &str,
) -> Result<Option<i64>, Box<dyn std::error::Error>> {
    if persistence.count_operators()? > 0 {
        debug!("Operators already exist, skipping bootstrap");
        return Ok(None);
    }

    PasswordPolicy::default().validate(password, password, login_name, BOOTSTRAP_DISPLAY_NAME)?;

    let event: AuditEvent = AuditEvent::new(
        Actor::system("bootstrap"),
        Cause::new(
            String::from("startup"),
            String::from("Bootstrap administrator"),
        ),
        Action::new(String::from("CreateOperator"), None),
        String::from("operator"),
        None,
    );
    let operator_id: i64 = persistence.create_operator(
        &NewOperator {
            login_name,
            display_name: BOOTSTRAP_DISPLAY_NAME,
            password,
            role: ROLE_ADMIN,
            agency_id: None,
            must_change_password: false,
        },
        &event,
    )?;

    info!(operator_id, login_name, "Created bootstrap administrator");
    Ok(Some(operator_id))
}

/// Spawns the task that purges expired sessions.
fn spawn_session_cleanup(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let mut persistence = app_state.persistence.lock().await;
            match persistence.delete_expired_sessions() {
                Ok(0) => debug!("No expired sessions to remove"),
                Ok(removed) => info!(removed, "Removed expired sessions"),
                Err(e) => error!(error = %e, "Failed to remove expired sessions"),
            }
        }
    });
}

// ============================================================================
// Health and authentication
// ============================================================================

/// Handler for GET `/health` endpoint.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for POST `/auth/login` endpoint.
async fn handle_login(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    info!(login_name = %req.login_name, "Handling login request");

    let mut persistence = app_state.persistence.lock().await;
    let response: LoginResponse = auth::login(&mut persistence, &req, app_state.session_lifetime)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/auth/logout` endpoint.
async fn handle_logout(
    AxumState(app_state): AxumState<AppState>,
    session: SessionOperator,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(operator_id = session.actor.operator_id, "Handling logout request");

    let mut persistence = app_state.persistence.lock().await;
    auth::logout(&mut persistence, &session.token)?;
    drop(persistence);

    Ok(Json(MessageResponse {
        message: String::from("Logged out"),
    }))
}

/// Handler for GET `/auth/me` endpoint.
async fn handle_whoami(session: SessionOperator) -> Json<WhoAmIResponse> {
    Json(auth::whoami(&session.actor, &session.operator))
}

/// Handler for POST `/auth/password` endpoint.
async fn handle_change_password(
    AxumState(app_state): AxumState<AppState>,
    session: SessionOperator,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(
        operator_id = session.actor.operator_id,
        "Handling change_password request"
    );

    let cause: Cause = request_cause(&session, "Change password");
    let mut persistence = app_state.persistence.lock().await;
    let response: MessageResponse = auth::change_password(
        &mut persistence,
        &req,
        &session.actor,
        &session.operator,
        cause,
    )?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Operators
// ============================================================================

/// Handler for GET `/operators` endpoint.
async fn handle_list_operators(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
) -> Result<Json<ListOperatorsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListOperatorsResponse =
        operators::list_operators(&mut persistence, &session.actor, &session.operator)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/operators` endpoint.
async fn handle_create_operator(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<CreateOperatorRequest>,
) -> Result<Json<CreateOperatorResponse>, HttpError> {
    info!(
        actor = %session.actor.login_name,
        login_name = %req.login_name,
        role = %req.role,
        "Handling create_operator request"
    );

    let cause: Cause = request_cause(&session, "Create operator");
    let mut persistence = app_state.persistence.lock().await;
    let response: CreateOperatorResponse =
        operators::create_operator(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/operators/{id}/disable` endpoint.
async fn handle_disable_operator(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(operator_id = id, "Handling disable_operator request");

    let cause: Cause = request_cause(&session, "Disable operator");
    let mut persistence = app_state.persistence.lock().await;
    let response: MessageResponse =
        operators::disable_operator(&mut persistence, id, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/operators/{id}/enable` endpoint.
async fn handle_enable_operator(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(operator_id = id, "Handling enable_operator request");

    let cause: Cause = request_cause(&session, "Enable operator");
    let mut persistence = app_state.persistence.lock().await;
    let response: MessageResponse =
        operators::enable_operator(&mut persistence, id, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Agencies
// ============================================================================

/// Handler for GET `/agencies` endpoint.
async fn handle_list_agencies(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
) -> Result<Json<ListAgenciesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListAgenciesResponse = agencies::list_agencies(&mut persistence, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/agencies` endpoint.
async fn handle_create_agency(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<CreateAgencyRequest>,
) -> Result<Json<CreateAgencyResponse>, HttpError> {
    info!(
        code = %req.agency.code,
        provision_login = req.login.is_some(),
        "Handling create_agency request"
    );

    let cause: Cause = request_cause(&session, "Create agency");
    let mut persistence = app_state.persistence.lock().await;
    let response: CreateAgencyResponse =
        agencies::create_agency(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/agencies/{id}` endpoint.
async fn handle_get_agency(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<AgencyInfo>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: AgencyInfo = agencies::get_agency(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for PUT `/agencies/{id}` endpoint.
async fn handle_update_agency(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<AgencyFields>,
) -> Result<Json<AgencyInfo>, HttpError> {
    info!(agency_id = id, "Handling update_agency request");

    let cause: Cause = request_cause(&session, "Update agency");
    let mut persistence = app_state.persistence.lock().await;
    let response: AgencyInfo =
        agencies::update_agency(&mut persistence, id, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for DELETE `/agencies/{id}` endpoint.
async fn handle_delete_agency(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<DeleteAgencyResponse>, HttpError> {
    info!(agency_id = id, "Handling delete_agency request");

    let cause: Cause = request_cause(&session, "Delete agency");
    let mut persistence = app_state.persistence.lock().await;
    let response: DeleteAgencyResponse =
        agencies::delete_agency(&mut persistence, id, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Livers
// ============================================================================

/// Handler for GET `/livers` endpoint.
async fn handle_list_livers(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Query(query): Query<ListLiversQuery>,
) -> Result<Json<ListLiversResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListLiversResponse =
        livers::list_livers(&mut persistence, &query, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/livers` endpoint.
async fn handle_create_liver(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<LiverFields>,
) -> Result<Json<LiverInfo>, HttpError> {
    info!(handle = %req.tiktok_handle, "Handling create_liver request");

    let cause: Cause = request_cause(&session, "Create liver");
    let mut persistence = app_state.persistence.lock().await;
    let response: LiverInfo = livers::create_liver(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for PUT `/livers/{id}` endpoint.
async fn handle_update_liver(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<LiverFields>,
) -> Result<Json<LiverInfo>, HttpError> {
    info!(liver_id = id, "Handling update_liver request");

    let cause: Cause = request_cause(&session, "Update liver");
    let mut persistence = app_state.persistence.lock().await;
    let response: LiverInfo =
        livers::update_liver(&mut persistence, id, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/livers/status` endpoint.
async fn handle_bulk_liver_status(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<BulkLiverStatusRequest>,
) -> Result<Json<BulkLiverStatusResponse>, HttpError> {
    info!(
        count = req.liver_ids.len(),
        status = %req.status,
        "Handling bulk_update_liver_status request"
    );

    let cause: Cause = request_cause(&session, "Bulk update liver status");
    let mut persistence = app_state.persistence.lock().await;
    let response: BulkLiverStatusResponse =
        livers::bulk_update_liver_status(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Applications
// ============================================================================

/// Handler for GET `/applications` endpoint.
async fn handle_list_applications(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<ListApplicationsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListApplicationsResponse =
        applications::list_applications(&mut persistence, &query, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/applications` endpoint.
async fn handle_submit_application(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<SubmitApplicationRequest>,
) -> Result<Json<ApplicationInfo>, HttpError> {
    info!(form_type = %req.form_type, "Handling submit_application request");

    let cause: Cause = request_cause(&session, "Submit application");
    let mut persistence = app_state.persistence.lock().await;
    let response: ApplicationInfo =
        applications::submit_application(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/applications/{id}` endpoint.
async fn handle_get_application(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<ApplicationInfo>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ApplicationInfo =
        applications::get_application(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/applications/{id}/transition` endpoint.
async fn handle_transition_application(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<TransitionApplicationRequest>,
) -> Result<Json<TransitionApplicationResponse>, HttpError> {
    info!(
        application_id = id,
        to = %req.to,
        expected_version = req.expected_version,
        "Handling transition_application request"
    );

    let cause: Cause = request_cause(&session, "Transition application");
    let mut persistence = app_state.persistence.lock().await;
    let response: TransitionApplicationResponse =
        applications::transition_application(&mut persistence, id, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

// ============================================================================
// Reports and refunds
// ============================================================================

/// Handler for GET `/reports` endpoint.
async fn handle_list_reports(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(_session): ActiveOperator,
) -> Result<Json<ListReportsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListReportsResponse = reports::list_reports(&mut persistence)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/reports/preview` endpoint.
///
/// Parses and prices the upload without storing anything.
async fn handle_preview_report(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<ReportImportRequest>,
) -> Result<Json<ImportPreviewResponse>, HttpError> {
    info!(
        bytes = req.csv.len(),
        data_month = ?req.data_month,
        "Handling preview_report_import request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: ImportPreviewResponse =
        preview_report_import(&mut persistence, &req, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/reports/import` endpoint.
async fn handle_import_report(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<ReportImportRequest>,
) -> Result<Json<ImportReportResponse>, HttpError> {
    info!(
        bytes = req.csv.len(),
        data_month = ?req.data_month,
        replace_existing = req.replace_existing,
        "Handling import_report request"
    );

    let cause: Cause = request_cause(&session, "Import report");
    let mut persistence = app_state.persistence.lock().await;
    let response: ImportReportResponse =
        import_report(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/reports/{id}` endpoint.
async fn handle_get_report(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<ReportDetailResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ReportDetailResponse =
        reports::get_report_detail(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/reports/{id}/exchange-rate` endpoint.
async fn handle_recalculate_exchange_rate(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<RecalculateExchangeRateRequest>,
) -> Result<Json<RecalculateExchangeRateResponse>, HttpError> {
    info!(
        report_id = id,
        exchange_rate = %req.exchange_rate,
        "Handling recalculate_exchange_rate request"
    );

    let cause: Cause = request_cause(&session, "Recalculate exchange rate");
    let mut persistence = app_state.persistence.lock().await;
    let response: RecalculateExchangeRateResponse =
        reports::recalculate_exchange_rate(&mut persistence, id, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/reports/{id}/exchange-rate-logs` endpoint.
async fn handle_list_exchange_rate_logs(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<ListExchangeRateLogsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListExchangeRateLogsResponse =
        reports::list_exchange_rate_logs(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/reports/{id}/refunds` endpoint.
async fn handle_list_refunds(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<ListRefundsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListRefundsResponse =
        reports::list_refunds(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/reports/{id}/refunds` endpoint.
async fn handle_create_refund(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<CreateRefundRequest>,
) -> Result<Json<RefundInfo>, HttpError> {
    info!(
        report_id = id,
        liver_id = ?req.liver_id,
        agency_id = ?req.agency_id,
        "Handling create_refund request"
    );

    let cause: Cause = request_cause(&session, "Create refund");
    let mut persistence = app_state.persistence.lock().await;
    let response: RefundInfo =
        reports::create_refund(&mut persistence, id, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for DELETE `/refunds/{id}` endpoint.
async fn handle_delete_refund(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(refund_id = id, "Handling delete_refund request");

    let cause: Cause = request_cause(&session, "Delete refund");
    let mut persistence = app_state.persistence.lock().await;
    reports::delete_refund(&mut persistence, id, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(MessageResponse {
        message: format!("Refund {id} deleted"),
    }))
}

// ============================================================================
// Invoices
// ============================================================================

/// Handler for GET `/invoices` endpoint.
async fn handle_list_invoices(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<ListInvoicesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListInvoicesResponse =
        invoices::list_invoices(&mut persistence, &query, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/invoices` endpoint.
async fn handle_generate_invoice(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Json(req): Json<GenerateInvoiceRequest>,
) -> Result<Json<InvoiceInfo>, HttpError> {
    info!(
        report_id = req.report_id,
        agency_id = req.agency_id,
        "Handling generate_invoice request"
    );

    let cause: Cause = request_cause(&session, "Generate invoice");
    let mut persistence = app_state.persistence.lock().await;
    let response: InvoiceInfo =
        invoices::generate_invoice(&mut persistence, &req, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for POST `/reports/{id}/invoices` endpoint.
///
/// Issues an invoice for every agency earning commission in the report.
async fn handle_generate_invoices_for_report(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
    Json(req): Json<GenerateInvoicesRequest>,
) -> Result<Json<GenerateInvoicesResponse>, HttpError> {
    info!(report_id = id, "Handling generate_invoices_for_report request");

    let cause: Cause = request_cause(&session, "Generate invoices for report");
    let mut persistence = app_state.persistence.lock().await;
    let response: GenerateInvoicesResponse = invoices::generate_invoices_for_report(
        &mut persistence,
        id,
        &req,
        &session.actor,
        cause,
    )?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/invoices/{id}` endpoint.
async fn handle_get_invoice(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<InvoiceInfo>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: InvoiceInfo = invoices::get_invoice(&mut persistence, id, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

/// Handler for GET `/invoices/{id}/pdf` endpoint.
async fn handle_invoice_pdf(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Response, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let pdf: InvoicePdf = invoices::invoice_pdf(
        &mut persistence,
        id,
        &session.actor,
        app_state.pdf_font.as_deref(),
    )?;
    drop(persistence);

    debug!(invoice_id = id, bytes = pdf.bytes.len(), "Rendered invoice PDF");
    let disposition: String = format!("attachment; filename=\"{}\"", pdf.filename);
    Ok((
        [
            (header::CONTENT_TYPE, String::from("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}

/// Handler for DELETE `/invoices/{id}` endpoint.
async fn handle_delete_invoice(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Path(IdPath { id }): Path<IdPath>,
) -> Result<Json<MessageResponse>, HttpError> {
    info!(invoice_id = id, "Handling delete_invoice request");

    let cause: Cause = request_cause(&session, "Delete invoice");
    let mut persistence = app_state.persistence.lock().await;
    invoices::delete_invoice(&mut persistence, id, &session.actor, cause)?;
    drop(persistence);

    Ok(Json(MessageResponse {
        message: format!("Invoice {id} deleted"),
    }))
}

// ============================================================================
// Audit
// ============================================================================

/// Handler for GET `/audit` endpoint.
async fn handle_list_audit_events(
    AxumState(app_state): AxumState<AppState>,
    ActiveOperator(session): ActiveOperator,
    Query(query): Query<ListAuditEventsQuery>,
) -> Result<Json<ListAuditEventsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: ListAuditEventsResponse =
        audit::list_audit_events(&mut persistence, &query, &session.actor)?;
    drop(persistence);

    Ok(Json(response))
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/me", get(handle_whoami))
        .route("/auth/password", post(handle_change_password))
        .route(
            "/operators",
            get(handle_list_operators).post(handle_create_operator),
        )
        .route("/operators/{id}/disable", post(handle_disable_operator))
        .route("/operators/{id}/enable", post(handle_enable_operator))
        .route(
            "/agencies",
            get(handle_list_agencies).post(handle_create_agency),
        )
        .route(
            "/agencies/{id}",
            get(handle_get_agency)
                .put(handle_update_agency)
                .delete(handle_delete_agency),
        )
        .route("/livers", get(handle_list_livers).post(handle_create_liver))
        .route("/livers/status", post(handle_bulk_liver_status))
        .route("/livers/{id}", axum::routing::put(handle_update_liver))
        .route(
            "/applications",
            get(handle_list_applications).post(handle_submit_application),
        )
        .route("/applications/{id}", get(handle_get_application))
        .route(
            "/applications/{id}/transition",
            post(handle_transition_application),
        )
        .route("/reports", get(handle_list_reports))
        .route("/reports/preview", post(handle_preview_report))
        .route("/reports/import", post(handle_import_report))
        .route("/reports/{id}", get(handle_get_report))
        .route(
            "/reports/{id}/exchange-rate",
            post(handle_recalculate_exchange_rate),
        )
        .route(
            "/reports/{id}/exchange-rate-logs",
            get(handle_list_exchange_rate_logs),
        )
        .route(
            "/reports/{id}/refunds",
            get(handle_list_refunds).post(handle_create_refund),
        )
        .route(
            "/reports/{id}/invoices",
            post(handle_generate_invoices_for_report),
        )
        .route("/refunds/{id}", axum::routing::delete(handle_delete_refund))
        .route(
            "/invoices",
            get(handle_list_invoices).post(handle_generate_invoice),
        )
        .route(
            "/invoices/{id}",
            get(handle_get_invoice).delete(handle_delete_invoice),
        )
        .route("/invoices/{id}/pdf", get(handle_invoice_pdf))
        .route("/audit", get(handle_list_audit_events))
        .with_state(app_state)
}

/// Reads the invoice font once at startup.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is empty.
fn load_pdf_font(path: Option<&std::path::Path>) -> Result<Option<Arc<[u8]>>, std::io::Error> {
    let Some(path) = path else {
        info!("No PDF font configured; invoices use the built-in Latin faces");
        return Ok(None);
    };
    let bytes: Vec<u8> = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("PDF font {} is empty", path.display()),
        ));
    }
    info!(path = %path.display(), bytes = bytes.len(), "Loaded PDF font");
    Ok(Some(Arc::from(bytes)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing LiverDesk Server");

    let mut persistence: Persistence = if let Some(url) = &args.mysql_url {
        info!("Using MySQL/MariaDB database");
        Persistence::new_with_mysql(url)?
    } else if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        Persistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        Persistence::new_in_memory()?
    };

    if let (Some(login_name), Some(password)) = (&args.bootstrap_admin, &args.bootstrap_password)
    {
        bootstrap_admin(&mut persistence, login_name, password)?;
    } else if persistence.count_operators()? == 0 {
        warn!("No operators exist; start with --bootstrap-admin to create one");
    }

    let app_state: AppState = AppState {
        persistence: Arc::new(Mutex::new(persistence)),
        session_lifetime: time::Duration::days(args.session_days),
        pdf_font: load_pdf_font(args.pdf_font.as_deref())?,
    };

    spawn_session_cleanup(app_state.clone());

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let listener = tokio::net::TcpListener::bind((args.bind.as_str(), args.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    // Run server
    axum::serve(listener, app).await?;

    Ok(())
}
