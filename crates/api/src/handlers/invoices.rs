// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeMap;

use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{DataMonth, InvoiceTotals, commission_jpy, next_invoice_number};
use liverdesk_persistence::{
    AgencyData, InvoiceData, InvoiceFilter, NewInvoice, Persistence, PersistenceError,
    ReportData,
};
use time::Date;
use tracing::{debug, info, warn};

use crate::auth::{AgencyScope, AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::reports::load_report;
use crate::handlers::{format_date, not_found, resolve_issue_date};
use crate::invoice_pdf::render_invoice_pdf;
use crate::request_response::{
    GenerateInvoiceRequest, GenerateInvoicesRequest, GenerateInvoicesResponse, InvoiceInfo,
    InvoicePdf, ListInvoicesQuery, ListInvoicesResponse, SkippedInvoice,
};

/// Attempts at picking a free invoice number before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 5;

fn load_invoice(persistence: &mut Persistence, invoice_id: i64) -> Result<InvoiceData, ApiError> {
    persistence
        .get_invoice(invoice_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?
        .ok_or_else(|| not_found("Invoice", invoice_id))
}

fn load_agency(persistence: &mut Persistence, agency_id: i64) -> Result<AgencyData, ApiError> {
    persistence
        .get_agency(agency_id)
        .map_err(|e| translate_persistence_error(e, "Agency"))?
        .ok_or_else(|| not_found("Agency", agency_id))
}

/// What every invoice issued in one request shares.
struct IssueRun<'a> {
    report: &'a ReportData,
    issue_date: Date,
    authenticated_actor: &'a AuthenticatedActor,
    cause: Cause,
}

/// Issues the invoice of one agency for one report.
///
/// Refunds are deducted at the agency's commission rate, so the agency
/// gives back the commission it earned on the refunded reward.
#[allow(clippy::too_many_lines)]
fn issue_invoice(
    persistence: &mut Persistence,
    run: &IssueRun<'_>,
    agency: &AgencyData,
    commission_total_jpy: i64,
    refunded_reward_jpy: i64,
) -> Result<InvoiceData, ApiError> {
    let report: &ReportData = run.report;
    let authenticated_actor: &AuthenticatedActor = run.authenticated_actor;
    let existing = persistence
        .find_invoice_for_agency_report(agency.agency_id, report.report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?;
    if let Some(invoice) = existing {
        return Err(ApiError::Conflict {
            resource_type: String::from("Invoice"),
            message: format!(
                "Agency {} already has invoice {} for {}",
                agency.code, invoice.invoice_number, report.data_month
            ),
        });
    }

    let refund_total_jpy: i64 =
        commission_jpy(refunded_reward_jpy, agency.commission_rate).map_err(translate_domain_error)?;
    let totals: InvoiceTotals = InvoiceTotals::compute(
        commission_total_jpy,
        refund_total_jpy,
        agency.is_invoice_registered,
        run.issue_date,
    )
    .map_err(translate_domain_error)?;
    let issue_date: String = format_date(run.issue_date)?;

    let invoice_id: i64 = insert_with_fresh_number(
        persistence,
        report.data_month,
        |persistence, invoice_number| {
            let new_invoice = NewInvoice {
                invoice_number: invoice_number.to_string(),
                agency_id: agency.agency_id,
                report_id: report.report_id,
                issue_date: issue_date.clone(),
                commission_total_jpy: totals.commission_total_jpy,
                refund_total_jpy: totals.refund_total_jpy,
                subtotal_jpy: totals.subtotal_jpy,
                refund_carryover_jpy: totals.refund_carryover_jpy,
                tax_jpy: totals.tax_jpy,
                total_jpy: totals.total_jpy,
                deductible_rate: totals.deductible_rate,
                deductible_tax_jpy: totals.deductible_tax_jpy,
                agency_name: agency.name.clone(),
                is_invoice_registered: agency.is_invoice_registered,
                invoice_registration_number: agency.invoice_registration_number.clone(),
                bank: agency.bank.clone(),
                created_by: authenticated_actor.operator_id,
            };
            let event: AuditEvent = authenticated_actor.audit_event(
                run.cause.clone(),
                "GenerateInvoice",
                Some(format!(
                    "Issued {invoice_number} to {} for {}: total {} JPY",
                    agency.code, report.data_month, totals.total_jpy
                )),
                "invoice",
                None,
            );
            persistence.insert_invoice(&new_invoice, &event)
        },
        |persistence| {
            // The agency may have been invoiced by the colliding writer.
            let raced = persistence
                .find_invoice_for_agency_report(agency.agency_id, report.report_id)
                .map_err(|e| translate_persistence_error(e, "Invoice"))?;
            match raced {
                Some(invoice) => Err(ApiError::Conflict {
                    resource_type: String::from("Invoice"),
                    message: format!(
                        "Agency {} already has invoice {} for {}",
                        agency.code, invoice.invoice_number, report.data_month
                    ),
                }),
                None => Ok(()),
            }
        },
    )?;

    info!(
        invoice_id,
        agency_id = agency.agency_id,
        report_id = report.report_id,
        "Invoice issued"
    );
    load_invoice(persistence, invoice_id)
}

/// Inserts a row under the next free invoice number of `month`.
///
/// `insert` is retried with a fresh number whenever it hits a unique
/// violation, after `on_collision` has had the chance to abort.
///
/// # Errors
///
/// Returns the first non-unique insert error, any error from
/// `on_collision`, or a conflict once every attempt collided.
pub(crate) fn insert_with_fresh_number(
    persistence: &mut Persistence,
    month: DataMonth,
    mut insert: impl FnMut(&mut Persistence, &str) -> Result<i64, PersistenceError>,
    mut on_collision: impl FnMut(&mut Persistence) -> Result<(), ApiError>,
) -> Result<i64, ApiError> {
    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let existing_numbers: Vec<String> = persistence
            .invoice_numbers_for_month(month)
            .map_err(|e| translate_persistence_error(e, "Invoice"))?;
        let invoice_number: String = next_invoice_number(month, &existing_numbers);

        match insert(persistence, &invoice_number) {
            Ok(id) => {
                debug!(attempt, invoice_number = %invoice_number, "Invoice number allocated");
                return Ok(id);
            }
            Err(PersistenceError::UniqueViolation(detail)) => {
                debug!(
                    attempt,
                    invoice_number = %invoice_number,
                    %detail,
                    "Invoice insert collided"
                );
                on_collision(persistence)?;
            }
            Err(e) => return Err(translate_persistence_error(e, "Invoice")),
        }
    }

    warn!(%month, "Gave up picking an invoice number");
    Err(ApiError::Conflict {
        resource_type: String::from("Invoice"),
        message: format!(
            "Could not allocate an invoice number for {month} after {MAX_NUMBER_ATTEMPTS} attempts"
        ),
    })
}

/// Issues the invoice of one agency for one report.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The report, agency and optional issue date
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The report or agency does not exist
/// - The issue date is malformed
/// - The agency already has an invoice for the report
/// - No free invoice number could be allocated
pub fn generate_invoice(
    persistence: &mut Persistence,
    request: &GenerateInvoiceRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<InvoiceInfo, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "generate_invoice")?;

    let issue_date: Date = resolve_issue_date(request.issue_date.as_deref())?;
    let report: ReportData = load_report(persistence, request.report_id)?;
    let agency: AgencyData = load_agency(persistence, request.agency_id)?;

    let commission: i64 = persistence
        .commission_totals_by_agency(report.report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?
        .get(&agency.agency_id)
        .copied()
        .unwrap_or(0);
    let refunds: i64 = persistence
        .refund_totals_by_agency(report.report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?
        .get(&agency.agency_id)
        .copied()
        .unwrap_or(0);

    let run = IssueRun {
        report: &report,
        issue_date,
        authenticated_actor,
        cause,
    };
    let invoice: InvoiceData = issue_invoice(persistence, &run, &agency, commission, refunds)?;
    Ok(InvoiceInfo::from(invoice))
}

/// Issues invoices for every agency that earned commission in a report.
///
/// Agencies that are already invoiced, or whose invoice fails, are
/// reported as skipped rather than aborting the batch.
///
/// # Errors
///
/// Returns an error if the actor is not an admin, the report does not
/// exist, or the issue date is malformed.
pub fn generate_invoices_for_report(
    persistence: &mut Persistence,
    report_id: i64,
    request: &GenerateInvoicesRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<GenerateInvoicesResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "generate_invoices_for_report")?;

    let issue_date: Date = resolve_issue_date(request.issue_date.as_deref())?;
    let report: ReportData = load_report(persistence, report_id)?;
    let commissions: BTreeMap<i64, i64> = persistence
        .commission_totals_by_agency(report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?;
    let refunds: BTreeMap<i64, i64> = persistence
        .refund_totals_by_agency(report_id)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?;

    let run = IssueRun {
        report: &report,
        issue_date,
        authenticated_actor,
        cause,
    };
    let mut generated: Vec<InvoiceInfo> = Vec::new();
    let mut skipped: Vec<SkippedInvoice> = Vec::new();

    for (&agency_id, &commission) in &commissions {
        if commission <= 0 {
            continue;
        }
        let refunded: i64 = refunds.get(&agency_id).copied().unwrap_or(0);
        let outcome: Result<InvoiceData, ApiError> = match load_agency(persistence, agency_id) {
            Ok(agency) => issue_invoice(persistence, &run, &agency, commission, refunded),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(invoice) => generated.push(InvoiceInfo::from(invoice)),
            Err(err) => {
                debug!(agency_id, %err, "Skipped invoice");
                skipped.push(SkippedInvoice {
                    agency_id,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        report_id,
        generated = generated.len(),
        skipped = skipped.len(),
        "Bulk invoice generation finished"
    );
    Ok(GenerateInvoicesResponse { generated, skipped })
}

/// Lists the invoices visible to the caller.
///
/// # Errors
///
/// Returns an error if the invoices cannot be loaded.
pub fn list_invoices(
    persistence: &mut Persistence,
    query: &ListInvoicesQuery,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ListInvoicesResponse, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let invoices: Vec<InvoiceInfo> = persistence
        .list_invoices(&InvoiceFilter {
            report_id: query.report_id,
            agency_ids: scope.as_filter(),
        })
        .map_err(|e| translate_persistence_error(e, "Invoice"))?
        .into_iter()
        .map(InvoiceInfo::from)
        .collect();
    Ok(ListInvoicesResponse { invoices })
}

fn load_visible_invoice(
    persistence: &mut Persistence,
    invoice_id: i64,
    authenticated_actor: &AuthenticatedActor,
    action: &str,
) -> Result<InvoiceData, ApiError> {
    let scope: AgencyScope = AuthorizationService::agency_scope(persistence, authenticated_actor)?;
    let invoice: InvoiceData = load_invoice(persistence, invoice_id)?;
    AuthorizationService::authorize_agency_scope(
        authenticated_actor,
        Some(invoice.agency_id),
        &scope,
        action,
    )?;
    Ok(invoice)
}

/// Returns one invoice.
///
/// # Errors
///
/// Returns an error if the invoice does not exist or belongs to an agency
/// outside the caller's subtree.
pub fn get_invoice(
    persistence: &mut Persistence,
    invoice_id: i64,
    authenticated_actor: &AuthenticatedActor,
) -> Result<InvoiceInfo, ApiError> {
    load_visible_invoice(persistence, invoice_id, authenticated_actor, "get_invoice")
        .map(InvoiceInfo::from)
}

/// Renders an invoice as a PDF document, embedding `font` when given.
///
/// # Errors
///
/// Returns an error if the invoice is not visible to the caller or the
/// document cannot be produced.
pub fn invoice_pdf(
    persistence: &mut Persistence,
    invoice_id: i64,
    authenticated_actor: &AuthenticatedActor,
    font: Option<&[u8]>,
) -> Result<InvoicePdf, ApiError> {
    let invoice: InvoiceData =
        load_visible_invoice(persistence, invoice_id, authenticated_actor, "invoice_pdf")?;
    let agency: AgencyData = load_agency(persistence, invoice.agency_id)?;
    let report: ReportData = load_report(persistence, invoice.report_id)?;

    let bytes: Vec<u8> = render_invoice_pdf(&invoice, &agency, &report, font)?;
    Ok(InvoicePdf {
        filename: format!("{}.pdf", invoice.invoice_number),
        bytes,
    })
}

/// Deletes an invoice so it can be issued again.
///
/// # Errors
///
/// Returns an error if the actor is not an admin or the invoice does not
/// exist.
pub fn delete_invoice(
    persistence: &mut Persistence,
    invoice_id: i64,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<(), ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "delete_invoice")?;

    let invoice: InvoiceData = load_invoice(persistence, invoice_id)?;
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        "DeleteInvoice",
        Some(format!("Deleted invoice {}", invoice.invoice_number)),
        "invoice",
        Some(invoice_id),
    );
    persistence
        .delete_invoice(invoice_id, &event)
        .map_err(|e| translate_persistence_error(e, "Invoice"))?;

    info!(invoice_id, invoice_number = %invoice.invoice_number, "Invoice deleted");
    Ok(())
}
