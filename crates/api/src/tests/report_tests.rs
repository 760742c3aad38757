// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_persistence::Persistence;

use crate::handlers::reports;
use crate::tests::helpers::{
    create_admin, create_agency, create_agency_operator, create_liver, create_test_cause,
    import_request, new_persistence,
};
use crate::{
    ApiError, AuthenticatedActor, CreateRefundRequest, RecalculateExchangeRateRequest,
    import_report, preview_report_import,
};

const REWARDS_CSV: &str = "\
creator_id,handle,diamonds,reward_usd,agency
7001,alice,5000,100,
,bob,100,10,ALPHA
,ghost,50,5,
";

struct Fixture {
    persistence: Persistence,
    admin: AuthenticatedActor,
    alpha: i64,
    alice: i64,
}

fn setup() -> Fixture {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let alice = create_liver(&mut persistence, &admin, "alice", Some("7001"), Some(alpha));
    Fixture {
        persistence,
        admin,
        alpha,
        alice,
    }
}

fn import(fixture: &mut Fixture, csv: &str, month: Option<&str>, rate: &str) -> i64 {
    import_report(
        &mut fixture.persistence,
        &import_request(csv, month, rate),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap()
    .report_id
}

fn refund(liver_id: Option<i64>, agency_id: Option<i64>, amount: &str) -> CreateRefundRequest {
    CreateRefundRequest {
        liver_id,
        agency_id,
        amount_usd: amount.to_string(),
        reason: Some(String::from("chargeback")),
    }
}

#[test]
fn test_preview_resolves_livers_and_agencies() {
    let mut fixture = setup();

    let preview = preview_report_import(
        &mut fixture.persistence,
        &import_request(REWARDS_CSV, Some("2024-05"), "150"),
        &fixture.admin,
    )
    .unwrap();

    assert_eq!(preview.data_month, "2024-05");
    assert_eq!(preview.month_collision, None);
    assert_eq!(preview.rows.len(), 3);
    assert_eq!(preview.unmatched_rows, 2);
    assert_eq!(preview.total_reward_jpy, 17_250);
    assert_eq!(preview.total_commission_jpy, 3_300);
    assert_eq!(
        preview.matched_columns.get("reward_usd").map(String::as_str),
        Some("reward_usd")
    );

    let alice = &preview.rows[0];
    assert_eq!(alice.liver_id, Some(fixture.alice));
    assert_eq!(alice.agency_id, Some(fixture.alpha));
    assert_eq!(alice.reward_jpy, 15_000);
    assert_eq!(alice.commission_jpy, 3_000);

    let bob = &preview.rows[1];
    assert_eq!(bob.liver_id, None);
    assert_eq!(bob.agency_id, Some(fixture.alpha));
    assert_eq!(bob.commission_jpy, 300);

    let ghost = &preview.rows[2];
    assert_eq!(ghost.agency_id, None);
    assert_eq!(ghost.commission_jpy, 0);

    assert!(reports::list_reports(&mut fixture.persistence).unwrap().reports.is_empty());
}

#[test]
fn test_import_uses_month_column() {
    let mut fixture = setup();
    let csv = "\
Creator ID,Reward (USD),Data Month
7001,42.5,2024-06
";

    let response = import_report(
        &mut fixture.persistence,
        &import_request(csv, None, "150"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(response.data_month, "2024-06");
    assert_eq!(response.rows_inserted, 1);
    assert!(response.replaced_report_id.is_none());
}

#[test]
fn test_import_without_month_rejected() {
    let mut fixture = setup();

    let err = import_report(
        &mut fixture.persistence,
        &import_request(REWARDS_CSV, None, "150"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidCsvFormat { .. }));
}

#[test]
fn test_import_requires_admin() {
    let mut fixture = setup();
    let (alpha_actor, _) =
        create_agency_operator(&mut fixture.persistence, &fixture.admin, fixture.alpha, "alpha");

    let err = import_report(
        &mut fixture.persistence,
        &import_request(REWARDS_CSV, Some("2024-05"), "150"),
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
}

#[test]
fn test_month_collision_requires_replace() {
    let mut fixture = setup();
    let first = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");

    let preview = preview_report_import(
        &mut fixture.persistence,
        &import_request(REWARDS_CSV, Some("2024-05"), "150"),
        &fixture.admin,
    )
    .unwrap();
    assert_eq!(preview.month_collision, Some(first));

    let err = import_report(
        &mut fixture.persistence,
        &import_request(REWARDS_CSV, Some("2024-05"), "150"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[test]
fn test_replace_migrates_refunds() {
    let mut fixture = setup();
    let first = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");
    reports::create_refund(
        &mut fixture.persistence,
        first,
        &refund(Some(fixture.alice), None, "10"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();

    let mut request = import_request(REWARDS_CSV, Some("2024-05"), "160");
    request.replace_existing = true;
    let response = import_report(
        &mut fixture.persistence,
        &request,
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();

    assert_eq!(response.replaced_report_id, Some(first));
    assert_eq!(response.refunds_migrated, 1);
    assert!(reports::get_report_detail(&mut fixture.persistence, first, &fixture.admin).is_err());

    let refunds =
        reports::list_refunds(&mut fixture.persistence, response.report_id, &fixture.admin)
            .unwrap();
    assert_eq!(refunds.refunds.len(), 1);
    assert_eq!(refunds.refunds[0].amount_jpy, 1_600);
}

#[test]
fn test_report_detail_is_scoped() {
    let mut fixture = setup();
    let report_id = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");
    let (alpha_actor, _) =
        create_agency_operator(&mut fixture.persistence, &fixture.admin, fixture.alpha, "alpha");

    let full = reports::get_report_detail(&mut fixture.persistence, report_id, &fixture.admin)
        .unwrap();
    assert_eq!(full.rows.len(), 3);
    assert_eq!(full.report.row_count, 3);

    let scoped =
        reports::get_report_detail(&mut fixture.persistence, report_id, &alpha_actor).unwrap();
    assert_eq!(scoped.rows.len(), 2);
    assert_eq!(scoped.total_commission_jpy, 3_300);
}

#[test]
fn test_recalculate_exchange_rate() {
    let mut fixture = setup();
    let report_id = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");
    reports::create_refund(
        &mut fixture.persistence,
        report_id,
        &refund(Some(fixture.alice), None, "10"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();

    let response = reports::recalculate_exchange_rate(
        &mut fixture.persistence,
        report_id,
        &RecalculateExchangeRateRequest {
            exchange_rate: String::from("160"),
        },
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(response.rows_recalculated, 3);
    assert_eq!(response.refunds_recalculated, 1);

    let detail = reports::get_report_detail(&mut fixture.persistence, report_id, &fixture.admin)
        .unwrap();
    assert_eq!(detail.total_reward_jpy, 18_400);
    assert_eq!(detail.total_commission_jpy, 3_520);

    let logs =
        reports::list_exchange_rate_logs(&mut fixture.persistence, report_id, &fixture.admin)
            .unwrap();
    assert_eq!(logs.logs.len(), 1);
    assert_eq!(logs.logs[0].old_rate.to_string(), "150");
    assert_eq!(logs.logs[0].new_rate.to_string(), "160");

    let err = reports::recalculate_exchange_rate(
        &mut fixture.persistence,
        report_id,
        &RecalculateExchangeRateRequest {
            exchange_rate: String::from("160.0"),
        },
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "exchange_rate_unchanged"
    ));
}

#[test]
fn test_refund_takes_liver_agency() {
    let mut fixture = setup();
    let report_id = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");

    let created = reports::create_refund(
        &mut fixture.persistence,
        report_id,
        &refund(Some(fixture.alice), None, "$10.00"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(created.agency_id, Some(fixture.alpha));
    assert_eq!(created.amount_jpy, 1_500);

    let beta = create_agency(&mut fixture.persistence, &fixture.admin, "BETA", "15", None);
    let (beta_actor, _) =
        create_agency_operator(&mut fixture.persistence, &fixture.admin, beta, "beta");
    let hidden = reports::list_refunds(&mut fixture.persistence, report_id, &beta_actor).unwrap();
    assert!(hidden.refunds.is_empty());

    reports::delete_refund(
        &mut fixture.persistence,
        created.refund_id,
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap();
    let remaining =
        reports::list_refunds(&mut fixture.persistence, report_id, &fixture.admin).unwrap();
    assert!(remaining.refunds.is_empty());
}

#[test]
fn test_refund_validation() {
    let mut fixture = setup();
    let report_id = import(&mut fixture, REWARDS_CSV, Some("2024-05"), "150");

    let err = reports::create_refund(
        &mut fixture.persistence,
        report_id,
        &refund(None, None, "10"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "agency_id"
    ));

    let err = reports::create_refund(
        &mut fixture.persistence,
        report_id,
        &refund(None, Some(fixture.alpha), "-5"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "amount_usd"
    ));

    let err = reports::create_refund(
        &mut fixture.persistence,
        999,
        &refund(None, Some(fixture.alpha), "5"),
        &fixture.admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::ResourceNotFound { .. }));
}
