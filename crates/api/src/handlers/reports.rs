// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{Decimal, ExchangeRate, usd_to_jpy};
use liverdesk_persistence::{
    LiverData, NewRefund, Persistence, RecalculationSummary, RefundData, ReportData,
    ReportRowData,
};
use tracing::{info, warn};

use crate::auth::{AgencyScope, AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::{checked_total_jpy, not_found, optional_text};
use crate::request_response::{
    CreateRefundRequest, ExchangeRateLogInfo, ListExchangeRateLogsResponse, ListRefundsResponse,
    ListReportsResponse, RecalculateExchangeRateRequest, RecalculateExchangeRateResponse,
    RefundInfo, ReportDetailResponse, ReportInfo, ReportRowInfo,
};

pub(crate) fn load_report(
    persistence: &mut Persistence,
    report_id: i64,
) -> Result<ReportData, ApiError> {
    persistence
        .get_report(report_id)
        .map_err(|e| translate_persistence_error(e, "Report"))?
        .ok_or_else(|| not_found("Report", report_id))
}

/// Refunds are frozen once any invoice exists for the report.
fn ensure_refunds_open(
    persistence: &mut Persistence,
    report: &ReportData,
    action: &str,
) -> Result<(), ApiError> {
    let invoice_count: i64 = persistence
        .count_invoices_for_report(report.report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?;
    if invoice_count > 0 {
        warn!(
            report_id = report.report_id,
            invoice_count, action, "Refund change refused: report already invoiced"
        );
        return Err(ApiError::Conflict {
            resource_type: String::from("Refund"),
            message: format!(
                "Cannot {action} refunds for {}: {invoice_count} invoice(s) already issued",
                report.data_month
            ),
        });
    }
    Ok(())
}

/// Lists every monthly report.
///
/// Reports themselves carry no agency data, so every operator may list
/// them; the rows inside are scoped by `get_report_detail`.
///
/// # Errors
///
/// Returns an error if the reports cannot be loaded.
pub fn list_reports(persistence: &mut Persistence) -> Result<ListReportsResponse, ApiError> {
    let reports: Vec<ReportInfo> = persistence
        .list_reports()
        .map_err(|e| translate_persistence_error(e, "Report"))?
        .into_iter()
        .map(ReportInfo::from)
        .collect();
    Ok(ListReportsResponse { reports })
}

/// Returns a report with the rows the caller may see.
///
/// # Errors
///
/// Returns an error if the report does not exist.
pub fn get_report_detail(
    persistence: &mut Persistence,
    report_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ReportDetailResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let report: ReportData = load_report(persistence, report_id)?;

    let agency_ids: Option<Vec<i64>> = scope.as_filter();
    let rows: Vec<ReportRowData> = persistence
        .list_report_rows(report_id, agency_ids.as_deref())
        .map_err(|e| translate_persistence_error(e, "Report"))?;

    Ok(ReportDetailResponse {
        report: ReportInfo::from(report),
        total_reward_jpy: checked_total_jpy(
            "total_reward_jpy",
            rows.iter().map(|r| r.reward_jpy),
        )?,
        total_commission_jpy: checked_total_jpy(
            "total_commission_jpy",
            rows.iter().map(|r| r.commission_jpy),
        )?,
        rows: rows.into_iter().map(ReportRowInfo::from).collect(),
    })
}

/// Changes a report's exchange rate and recomputes every row and refund.
///
/// The change is logged with the old and new rate. Reports with issued
/// invoices are frozen.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `report_id` - The report to recalculate
/// * `request` - The new rate
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The report does not exist
/// - The rate is invalid or equal to the current rate
/// - Invoices were already issued for the report
pub fn recalculate_exchange_rate(
    persistence: &mut Persistence,
    report_id: i64,
    request: &RecalculateExchangeRateRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<RecalculateExchangeRateResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "recalculate_exchange_rate")?;

    let new_rate: ExchangeRate = request
        .exchange_rate
        .trim()
        .parse()
        .map_err(translate_domain_error)?;
    let report: ReportData = load_report(persistence, report_id)?;
    if report.exchange_rate.value() == new_rate.value() {
        return Err(ApiError::DomainRuleViolation {
            rule: String::from("exchange_rate_unchanged"),
            message: format!(
                "Report {report_id} already uses the rate {}",
                new_rate.value()
            ),
        });
    }

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "RecalculateExchangeRate",
        Some(format!(
            "Changed rate of {} from {} to {}",
            report.data_month,
            report.exchange_rate.value(),
            new_rate.value()
        )),
        "report",
        Some(report_id),
    );
    let summary: RecalculationSummary = persistence
        .recalculate_report(report_id, new_rate, authenticated_actor.operator_id, &event)
        .map_err(|e| translate_persistence_error(e, "Report"))?;

    info!(
        report_id,
        rows = summary.rows_recalculated,
        refunds = summary.refunds_recalculated,
        "Exchange rate recalculated"
    );
    Ok(RecalculateExchangeRateResponse {
        report_id,
        old_rate: summary.old_rate.value(),
        new_rate: summary.new_rate.value(),
        rows_recalculated: summary.rows_recalculated,
        refunds_recalculated: summary.refunds_recalculated,
    })
}

/// Lists the exchange rate changes of a report, oldest first.
///
/// # Errors
///
/// Returns an error if the actor is not an admin or the report does not
/// exist.
pub fn list_exchange_rate_logs(
    persistence: &mut Persistence,
    report_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListExchangeRateLogsResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "list_exchange_rate_logs")?;
    load_report(persistence, report_id)?;

    let logs: Vec<ExchangeRateLogInfo> = persistence
        .list_exchange_rate_logs(report_id)
        .map_err(|e| translate_persistence_error(e, "Report"))?
        .into_iter()
        .map(ExchangeRateLogInfo::from)
        .collect();
    Ok(ListExchangeRateLogsResponse { logs })
}

/// Records a refund against a report.
///
/// The USD amount is converted at the report's rate. The refund belongs to
/// the named agency, else to the liver's agency.
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The report or liver does not exist
/// - The amount is not a positive number
/// - The refund has no agency
/// - Any invoice was already issued for the report
#[allow(clippy::too_many_lines)]
pub fn create_refund(
    persistence: &mut Persistence,
    report_id: i64,
    request: &CreateRefundRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<RefundInfo, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "create_refund")?;

    let report: ReportData = load_report(persistence, report_id)?;
    let amount_usd: Decimal = request
        .amount_usd
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| ApiError::InvalidInput {
            field: String::from("amount_usd"),
            message: format!("'{}' is not a number", request.amount_usd),
        })?;
    if amount_usd <= Decimal::ZERO {
        return Err(ApiError::InvalidInput {
            field: String::from("amount_usd"),
            message: String::from("Refund amount must be positive"),
        });
    }

    let liver: Option<LiverData> = match request.liver_id {
        Some(liver_id) => Some(
            persistence
                .get_liver(liver_id)
                .map_err(|e| translate_persistence_error(e, "Liver"))?
                .ok_or_else(|| not_found("Liver", liver_id))?,
        ),
        None => None,
    };
    let agency_id: i64 = request
        .agency_id
        .or_else(|| liver.as_ref().and_then(|l| l.agency_id))
        .ok_or_else(|| ApiError::InvalidInput {
            field: String::from("agency_id"),
            message: String::from("A refund needs an agency, directly or through its liver"),
        })?;
    persistence
        .get_agency(agency_id)
        .map_err(|e| translate_persistence_error(e, "Agency"))?
        .ok_or_else(|| not_found("Agency", agency_id))?;

    ensure_refunds_open(persistence, &report, "create")?;

    let amount_jpy: i64 =
        usd_to_jpy(amount_usd, report.exchange_rate).map_err(translate_domain_error)?;
    let new_refund = NewRefund {
        report_id,
        liver_id: request.liver_id,
        agency_id: Some(agency_id),
        amount_usd,
        amount_jpy,
        reason: optional_text(request.reason.as_deref()),
        created_by: authenticated_actor.operator_id,
    };
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "CreateRefund",
        Some(format!(
            "Refund of {amount_usd} USD for agency {agency_id} in {}",
            report.data_month
        )),
        "refund",
        None,
    );
    let refund_id: i64 = persistence
        .create_refund(&new_refund, &event)
        .map_err(|e| translate_persistence_error(e, "Refund"))?;

    info!(refund_id, report_id, agency_id, amount_jpy, "Refund recorded");
    let refund: RefundData = persistence
        .get_refund(refund_id)
        .map_err(|e| translate_persistence_error(e, "Refund"))?
        .ok_or_else(|| not_found("Refund", refund_id))?;
    Ok(RefundInfo::from(refund))
}

/// Lists the refunds of a report visible to the caller.
///
/// # Errors
///
/// Returns an error if the report does not exist.
pub fn list_refunds(
    persistence: &mut Persistence,
    report_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListRefundsResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    load_report(persistence, report_id)?;

    let refunds: Vec<RefundInfo> = persistence
        .list_refunds(report_id)
        .map_err(|e| translate_persistence_error(e, "Refund"))?
        .into_iter()
        .filter(|refund| scope.contains(refund.agency_id))
        .map(RefundInfo::from)
        .collect();
    Ok(ListRefundsResponse { refunds })
}

/// Deletes a refund.
///
/// # Errors
///
/// Returns an error if the actor is not an admin, the refund does not
/// exist, or any invoice was already issued for its report.
pub fn delete_refund(
    persistence: &mut Persistence,
    refund_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<(), ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "delete_refund")?;

    let refund: RefundData = persistence
        .get_refund(refund_id)
        .map_err(|e| translate_persistence_error(e, "Refund"))?
        .ok_or_else(|| not_found("Refund", refund_id))?;
    let report: ReportData = load_report(persistence, refund.report_id)?;
    ensure_refunds_open(persistence, &report, "delete")?;

    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "DeleteRefund",
        Some(format!(
            "Deleted refund of {} USD from report {}",
            refund.amount_usd, refund.report_id
        )),
        "refund",
        Some(refund_id),
    );
    persistence
        .delete_refund(refund_id, &event)
        .map_err(|e| translate_persistence_error(e, "Refund"))?;

    info!(refund_id, "Refund deleted");
    Ok(())
}
