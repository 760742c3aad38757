// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod application_tests;
mod audit_tests;
mod liver_tests;
mod operator_tests;
mod report_tests;

use std::str::FromStr;

use liverdesk_audit::{Action, Actor, AuditEvent, Cause};
use liverdesk_domain::{
    AgencyRank, CommissionRate, DataMonth, Decimal, ExchangeRate, LiverStatus, RewardLine,
};

use crate::{
    BankDetails, NewAgency, NewLiver, NewOperator, NewReport, NewReportRow, Persistence,
    ROLE_ADMIN,
};

pub fn create_test_actor() -> Actor {
    Actor::system("test")
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("test-cause"), String::from("Test operation"))
}

/// Builds an audit event with no entity id.
pub fn test_event(action: &str, entity_type: &str) -> AuditEvent {
    AuditEvent::new(
        create_test_actor(),
        create_test_cause(),
        Action::new(action.to_string(), None),
        entity_type.to_string(),
        None,
    )
}

pub fn new_persistence() -> Persistence {
    Persistence::new_in_memory().unwrap()
}

/// Creates an admin operator and returns its id.
pub fn create_admin(persistence: &mut Persistence, login_name: &str) -> i64 {
    persistence
        .create_operator(
            &NewOperator {
                login_name,
                display_name: "Test Admin",
                password: "CorrectHorse42!",
                role: ROLE_ADMIN,
                agency_id: None,
                must_change_password: false,
            },
            &test_event("CreateOperator", "operator"),
        )
        .unwrap()
}

pub fn sample_agency(code: &str, commission_percent: &str) -> NewAgency {
    NewAgency {
        name: format!("Agency {code}"),
        code: code.to_string(),
        commission_rate: CommissionRate::from_str(commission_percent).unwrap(),
        rank: AgencyRank::C,
        parent_agency_id: None,
        contact_email: Some(format!("{}@example.com", code.to_lowercase())),
        bank: BankDetails {
            bank_name: Some(String::from("Mizuho")),
            bank_branch: Some(String::from("Shibuya")),
            bank_account_type: Some(String::from("ordinary")),
            bank_account_number: Some(String::from("1234567")),
            bank_account_holder: Some(String::from("AGENCY KK")),
        },
        invoice_registration_number: None,
    }
}

pub fn create_agency(persistence: &mut Persistence, code: &str, commission_percent: &str) -> i64 {
    persistence
        .create_agency(
            &sample_agency(code, commission_percent),
            &test_event("CreateAgency", "agency"),
        )
        .unwrap()
}

pub fn sample_liver(handle: &str, user_id: Option<&str>, agency_id: Option<i64>) -> NewLiver {
    NewLiver {
        tiktok_user_id: user_id.map(str::to_string),
        tiktok_handle: handle.to_string(),
        display_name: format!("Liver {handle}"),
        real_name: None,
        email: None,
        status: LiverStatus::Active,
        agency_id,
        joined_at: None,
        notes: None,
    }
}

pub fn create_liver(
    persistence: &mut Persistence,
    handle: &str,
    user_id: Option<&str>,
    agency_id: Option<i64>,
) -> i64 {
    persistence
        .create_liver(
            &sample_liver(handle, user_id, agency_id),
            &test_event("CreateLiver", "liver"),
        )
        .unwrap()
}

pub fn sample_report(month: &str, rate: &str, created_by: i64) -> NewReport {
    NewReport {
        data_month: DataMonth::parse(month).unwrap(),
        exchange_rate: ExchangeRate::from_str(rate).unwrap(),
        revenue_task: Some(String::from("Monthly creator rewards")),
        source_filename: Some(format!("rewards-{month}.csv")),
        created_by,
    }
}

/// Builds a report row with yen figures computed from `reward_usd`.
pub fn sample_row(
    agency_id: Option<i64>,
    liver_id: Option<i64>,
    reward_usd: &str,
    rate: &str,
    commission_percent: &str,
) -> NewReportRow {
    let reward_usd = Decimal::from_str(reward_usd).unwrap();
    let commission_rate = CommissionRate::from_str(commission_percent).unwrap();
    let line = RewardLine::compute(
        reward_usd,
        ExchangeRate::from_str(rate).unwrap(),
        commission_rate,
    )
    .unwrap();
    NewReportRow {
        agency_id,
        liver_id,
        creator_id: liver_id.map(|id| format!("7000{id}")),
        creator_handle: liver_id.map(|id| format!("liver{id}")),
        creator_name: None,
        diamonds: 1000,
        reward_usd,
        reward_jpy: line.reward_jpy,
        commission_rate,
        commission_jpy: line.commission_jpy,
        raw: serde_json::json!({ "reward_usd": reward_usd.to_string() }),
    }
}
