// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Agency queries.

use diesel::prelude::*;
use diesel::{MysqlConnection, SqliteConnection};
use std::collections::HashMap;
use tracing::debug;

use crate::data_models::{AgencyData, BankDetails};
use crate::diesel_schema::{agencies, applications, csv_data_rows, invoices, livers, refunds};
use crate::error::PersistenceError;

#[derive(Queryable, Selectable)]
#[diesel(table_name = agencies)]
pub(crate) struct AgencyRow {
    agency_id: i64,
    name: String,
    code: String,
    commission_rate: String,
    agency_rank: String,
    parent_agency_id: Option<i64>,
    contact_email: Option<String>,
    bank_name: Option<String>,
    bank_branch: Option<String>,
    bank_account_type: Option<String>,
    bank_account_number: Option<String>,
    bank_account_holder: Option<String>,
    invoice_registration_number: Option<String>,
    is_invoice_registered: i32,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AgencyRow> for AgencyData {
    type Error = PersistenceError;

    fn try_from(row: AgencyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            agency_id: row.agency_id,
            name: row.name,
            code: row.code,
            commission_rate: row.commission_rate.parse()?,
            rank: row.agency_rank.parse()?,
            parent_agency_id: row.parent_agency_id,
            contact_email: row.contact_email,
            bank: BankDetails {
                bank_name: row.bank_name,
                bank_branch: row.bank_branch,
                bank_account_type: row.bank_account_type,
                bank_account_number: row.bank_account_number,
                bank_account_holder: row.bank_account_holder,
            },
            invoice_registration_number: row.invoice_registration_number,
            is_invoice_registered: row.is_invoice_registered != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

backend_fn! {
/// Retrieves an agency by id.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
/// Returns `Ok(None)` if the agency does not exist.
pub fn get_agency(conn: &mut _, agency_id: i64) -> Result<Option<AgencyData>, PersistenceError> {
    debug!(agency_id, "Loading agency");

    let row: Option<AgencyRow> = agencies::table
        .filter(agencies::agency_id.eq(agency_id))
        .select(AgencyRow::as_select())
        .first(conn)
        .optional()?;

    row.map(AgencyData::try_from).transpose()
}
}

backend_fn! {
/// Retrieves an agency by its (upper-case) code.
///
/// # Errors
///
/// Returns an error if the query fails or the stored row is invalid.
pub fn find_agency_by_code(
    conn: &mut _,
    code: &str,
) -> Result<Option<AgencyData>, PersistenceError> {
    let row: Option<AgencyRow> = agencies::table
        .filter(agencies::code.eq(code.trim().to_ascii_uppercase()))
        .select(AgencyRow::as_select())
        .first(conn)
        .optional()?;

    row.map(AgencyData::try_from).transpose()
}
}

backend_fn! {
/// Lists all agencies ordered by code.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row is invalid.
pub fn list_agencies(conn: &mut _) -> Result<Vec<AgencyData>, PersistenceError> {
    let rows: Vec<AgencyRow> = agencies::table
        .order(agencies::code.asc())
        .select(AgencyRow::as_select())
        .load(conn)?;

    rows.into_iter().map(AgencyData::try_from).collect()
}
}

backend_fn! {
/// Returns a map of every agency id to its parent id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn agency_parent_map(conn: &mut _) -> Result<HashMap<i64, Option<i64>>, PersistenceError> {
    let pairs: Vec<(i64, Option<i64>)> = agencies::table
        .select((agencies::agency_id, agencies::parent_agency_id))
        .load(conn)?;

    Ok(pairs.into_iter().collect())
}
}

/// Counts of records that still point at an agency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgencyReferences {
    pub livers: i64,
    pub children: i64,
    pub report_rows: i64,
    pub invoices: i64,
    pub applications: i64,
    pub refunds: i64,
}

impl AgencyReferences {
    /// Describes the first blocking reference, if any.
    #[must_use]
    pub fn blocking_reason(&self) -> Option<String> {
        [
            (self.livers, "livers"),
            (self.children, "child agencies"),
            (self.report_rows, "report rows"),
            (self.invoices, "invoices"),
            (self.applications, "applications"),
            (self.refunds, "refunds"),
        ]
        .into_iter()
        .find(|(count, _)| *count > 0)
        .map(|(count, what)| format!("referenced by {count} {what}"))
    }
}

backend_fn! {
/// Counts the records that block deleting an agency.
///
/// Operator accounts are not counted; they are detached on delete.
///
/// # Errors
///
/// Returns an error if any count query fails.
pub fn agency_references(
    conn: &mut _,
    agency_id: i64,
) -> Result<AgencyReferences, PersistenceError> {
    Ok(AgencyReferences {
        livers: livers::table
            .filter(livers::agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
        children: agencies::table
            .filter(agencies::parent_agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
        report_rows: csv_data_rows::table
            .filter(csv_data_rows::agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
        invoices: invoices::table
            .filter(invoices::agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
        applications: applications::table
            .filter(applications::agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
        refunds: refunds::table
            .filter(refunds::agency_id.eq(agency_id))
            .count()
            .get_result(conn)?,
    })
}
}
