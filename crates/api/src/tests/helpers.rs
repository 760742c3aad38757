// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use liverdesk_audit::{Action, Actor, AuditEvent, Cause};
use liverdesk_persistence::{BankDetails, NewOperator, OperatorData, Persistence, ROLE_ADMIN};

use crate::handlers::{agencies, livers, operators};
use crate::{
    AgencyFields, AuthenticatedActor, CreateAgencyRequest, CreateOperatorRequest, LiverFields,
    ReportImportRequest,
};

pub const TEST_PASSWORD: &str = "Tr1cky-Horse-99";

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-456"), String::from("API request"))
}

pub fn new_persistence() -> Persistence {
    Persistence::new_in_memory().unwrap()
}

/// Creates an admin directly in storage and returns it as an actor.
pub fn create_admin(
    persistence: &mut Persistence,
    login_name: &str,
) -> (AuthenticatedActor, OperatorData) {
    let event = AuditEvent::new(
        Actor::system("bootstrap"),
        create_test_cause(),
        Action::new(String::from("CreateOperator"), None),
        String::from("operator"),
        None,
    );
    let operator_id = persistence
        .create_operator(
            &NewOperator {
                login_name,
                display_name: "Test Admin",
                password: TEST_PASSWORD,
                role: ROLE_ADMIN,
                agency_id: None,
                must_change_password: false,
            },
            &event,
        )
        .unwrap();
    load_actor(persistence, operator_id)
}

pub fn load_actor(
    persistence: &mut Persistence,
    operator_id: i64,
) -> (AuthenticatedActor, OperatorData) {
    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .expect("operator exists");
    let actor = AuthenticatedActor::from_operator(&operator, None).unwrap();
    (actor, operator)
}

pub fn agency_fields(code: &str, commission_rate: &str, parent: Option<i64>) -> AgencyFields {
    AgencyFields {
        name: format!("Agency {code}"),
        code: code.to_string(),
        commission_rate: commission_rate.to_string(),
        rank: String::from("B"),
        parent_agency_id: parent,
        contact_email: Some(format!("{}@example.com", code.to_lowercase())),
        bank: BankDetails {
            bank_name: Some(String::from("Mizuho")),
            bank_branch: Some(String::from("Shibuya")),
            bank_account_type: Some(String::from("ordinary")),
            bank_account_number: Some(String::from("1234567")),
            bank_account_holder: Some(format!("{code} KK")),
        },
        invoice_registration_number: Some(String::from("T1234567890123")),
    }
}

pub fn create_agency(
    persistence: &mut Persistence,
    admin: &AuthenticatedActor,
    code: &str,
    commission_rate: &str,
    parent: Option<i64>,
) -> i64 {
    agencies::create_agency(
        persistence,
        &CreateAgencyRequest {
            agency: agency_fields(code, commission_rate, parent),
            login: None,
        },
        admin,
        create_test_cause(),
    )
    .unwrap()
    .agency
    .agency_id
}

/// Creates an agency login with a known password.
pub fn create_agency_operator(
    persistence: &mut Persistence,
    admin: &AuthenticatedActor,
    agency_id: i64,
    login_name: &str,
) -> (AuthenticatedActor, OperatorData) {
    let response = operators::create_operator(
        persistence,
        &CreateOperatorRequest {
            login_name: login_name.to_string(),
            display_name: format!("Operator {login_name}"),
            password: TEST_PASSWORD.to_string(),
            password_confirmation: TEST_PASSWORD.to_string(),
            role: String::from("Agency"),
            agency_id: Some(agency_id),
        },
        admin,
        create_test_cause(),
    )
    .unwrap();
    load_actor(persistence, response.operator.operator_id)
}

pub fn liver_fields(handle: &str, agency_id: Option<i64>) -> LiverFields {
    LiverFields {
        tiktok_handle: handle.to_string(),
        display_name: format!("Liver {handle}"),
        tiktok_user_id: None,
        real_name: None,
        email: None,
        status: None,
        agency_id,
        joined_at: None,
        notes: None,
    }
}

pub fn create_liver(
    persistence: &mut Persistence,
    actor: &AuthenticatedActor,
    handle: &str,
    tiktok_user_id: Option<&str>,
    agency_id: Option<i64>,
) -> i64 {
    let mut fields = liver_fields(handle, agency_id);
    fields.tiktok_user_id = tiktok_user_id.map(ToString::to_string);
    livers::create_liver(persistence, &fields, actor, create_test_cause())
        .unwrap()
        .liver_id
}

pub fn import_request(csv: &str, data_month: Option<&str>, rate: &str) -> ReportImportRequest {
    ReportImportRequest {
        csv: csv.to_string(),
        source_filename: Some(String::from("rewards.csv")),
        data_month: data_month.map(ToString::to_string),
        exchange_rate: rate.to_string(),
        revenue_task: None,
        replace_existing: false,
    }
}
