// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for monthly report import, refunds and exchange-rate recalculation.

use std::str::FromStr;

use super::{
    create_admin, create_agency, create_liver, new_persistence, sample_report, sample_row,
    test_event,
};
use crate::{NewRefund, Persistence, PersistenceError};
use liverdesk_domain::{DataMonth, Decimal, ExchangeRate};

fn import_month(persistence: &mut Persistence, month: &str, rate: &str, admin: i64) -> i64 {
    let agency = create_agency(persistence, "ALPHA", "20");
    let liver = create_liver(persistence, "alpha_star", Some("7001"), Some(agency));
    let rows = vec![
        sample_row(Some(agency), Some(liver), "100", rate, "20"),
        sample_row(Some(agency), None, "33.33", rate, "20"),
        sample_row(None, None, "5", rate, "0"),
    ];
    persistence
        .import_report(
            &sample_report(month, rate, admin),
            &rows,
            None,
            &test_event("ImportReport", "report"),
        )
        .unwrap()
        .report_id
}

fn add_refund(persistence: &mut Persistence, report_id: i64, usd: &str, jpy: i64, admin: i64) -> i64 {
    let agency = persistence
        .find_agency_by_code("ALPHA")
        .unwrap()
        .map(|a| a.agency_id);
    persistence
        .create_refund(
            &NewRefund {
                report_id,
                liver_id: None,
                agency_id: agency,
                amount_usd: Decimal::from_str(usd).unwrap(),
                amount_jpy: jpy,
                reason: Some(String::from("Chargeback")),
                created_by: admin,
            },
            &test_event("CreateRefund", "refund"),
        )
        .unwrap()
}

#[test]
fn test_import_stores_report_and_rows() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");

    let report_id = import_month(&mut persistence, "2026-01", "150", admin);

    let report = persistence.get_report(report_id).unwrap().unwrap();
    assert_eq!(report.data_month, DataMonth::new(2026, 1).unwrap());
    assert_eq!(report.exchange_rate, ExchangeRate::from_str("150").unwrap());
    assert_eq!(report.row_count, 3);

    let rows = persistence.list_report_rows(report_id, None).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].reward_jpy, 15_000);
    assert_eq!(rows[0].commission_jpy, 3_000);
    assert_eq!(rows[1].reward_jpy, 4_999);
    assert_eq!(rows[1].commission_jpy, 999);

    let events = persistence.list_audit_events(Some("report"), 10).unwrap();
    assert_eq!(events[0].event.entity_id, Some(report_id));
}

#[test]
fn test_report_rows_can_be_scoped_to_agencies() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let report_id = import_month(&mut persistence, "2026-01", "150", admin);
    let agency = persistence.find_agency_by_code("ALPHA").unwrap().unwrap();

    let scoped = persistence
        .list_report_rows(report_id, Some(&[agency.agency_id]))
        .unwrap();
    assert_eq!(scoped.len(), 2);

    let nothing = persistence.list_report_rows(report_id, Some(&[])).unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn test_second_import_for_same_month_is_rejected() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let report_id = import_month(&mut persistence, "2026-01", "150", admin);

    let result = persistence.import_report(
        &sample_report("2026-01", "151", admin),
        &[],
        None,
        &test_event("ImportReport", "report"),
    );

    match result {
        Err(PersistenceError::DuplicateDataMonth {
            report_id: existing,
            ..
        }) => assert_eq!(existing, report_id),
        other => panic!("expected DuplicateDataMonth, got {other:?}"),
    }
    assert_eq!(persistence.list_reports().unwrap().len(), 1);
}

#[test]
fn test_replace_import_carries_refunds_at_new_rate() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let old_id = import_month(&mut persistence, "2026-01", "150", admin);
    add_refund(&mut persistence, old_id, "10", 1_500, admin);
    let agency = persistence.find_agency_by_code("ALPHA").unwrap().unwrap();

    let outcome = persistence
        .import_report(
            &sample_report("2026-01", "160", admin),
            &[sample_row(Some(agency.agency_id), None, "50", "160", "20")],
            Some(old_id),
            &test_event("ImportReport", "report"),
        )
        .unwrap();

    assert_eq!(outcome.replaced_report_id, Some(old_id));
    assert_eq!(outcome.refunds_migrated, 1);
    assert_eq!(outcome.rows_inserted, 1);
    assert!(persistence.get_report(old_id).unwrap().is_none());

    let refunds = persistence.list_refunds(outcome.report_id).unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount_jpy, 1_600);
    assert_eq!(refunds[0].agency_id, Some(agency.agency_id));
    assert_eq!(refunds[0].reason.as_deref(), Some("Chargeback"));
}

#[test]
fn test_replace_with_wrong_report_id_is_not_found() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let report_id = import_month(&mut persistence, "2026-01", "150", admin);

    let result = persistence.import_report(
        &sample_report("2026-01", "150", admin),
        &[],
        Some(report_id + 100),
        &test_event("ImportReport", "report"),
    );

    assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    assert!(persistence.get_report(report_id).unwrap().is_some());
}

#[test]
fn test_recalculate_updates_rows_refunds_and_logs() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let report_id = import_month(&mut persistence, "2026-01", "150", admin);
    add_refund(&mut persistence, report_id, "10", 1_500, admin);

    let summary = persistence
        .recalculate_report(
            report_id,
            ExchangeRate::from_str("155.5").unwrap(),
            admin,
            &test_event("RecalculateReport", "report"),
        )
        .unwrap();

    assert_eq!(summary.rows_recalculated, 3);
    assert_eq!(summary.refunds_recalculated, 1);
    assert_eq!(summary.old_rate, ExchangeRate::from_str("150").unwrap());

    let rows = persistence.list_report_rows(report_id, None).unwrap();
    assert_eq!(rows[0].reward_jpy, 15_550);
    assert_eq!(rows[0].commission_jpy, 3_110);
    // 33.33 * 155.5 = 5182.815
    assert_eq!(rows[1].reward_jpy, 5_182);
    assert_eq!(rows[1].commission_jpy, 1_036);

    let refunds = persistence.list_refunds(report_id).unwrap();
    assert_eq!(refunds[0].amount_jpy, 1_555);

    let report = persistence.get_report(report_id).unwrap().unwrap();
    assert_eq!(report.exchange_rate, ExchangeRate::from_str("155.5").unwrap());

    let logs = persistence.list_exchange_rate_logs(report_id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].rows_recalculated, 3);
    assert_eq!(logs[0].refunds_recalculated, 1);
    assert_eq!(logs[0].changed_by, admin);
}

#[test]
fn test_recalculate_missing_report_is_not_found() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");

    let result = persistence.recalculate_report(
        9,
        ExchangeRate::from_str("150").unwrap(),
        admin,
        &test_event("RecalculateReport", "report"),
    );

    assert!(matches!(result, Err(PersistenceError::NotFound(_))));
}

#[test]
fn test_delete_refund() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let report_id = import_month(&mut persistence, "2026-01", "150", admin);
    let refund_id = add_refund(&mut persistence, report_id, "10", 1_500, admin);

    assert!(persistence.get_refund(refund_id).unwrap().is_some());
    persistence
        .delete_refund(refund_id, &test_event("DeleteRefund", "refund"))
        .unwrap();
    assert!(persistence.get_refund(refund_id).unwrap().is_none());

    let again = persistence.delete_refund(refund_id, &test_event("DeleteRefund", "refund"));
    assert!(matches!(again, Err(PersistenceError::NotFound(_))));
}

#[test]
fn test_reports_list_newest_month_first() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    import_month(&mut persistence, "2025-12", "150", admin);
    persistence
        .import_report(
            &sample_report("2026-02", "150", admin),
            &[],
            None,
            &test_event("ImportReport", "report"),
        )
        .unwrap();

    let months: Vec<String> = persistence
        .list_reports()
        .unwrap()
        .iter()
        .map(|r| r.data_month.to_string())
        .collect();
    assert_eq!(months, vec!["2026-02", "2025-12"]);
    assert!(
        persistence
            .find_report_by_month(DataMonth::new(2025, 12).unwrap())
            .unwrap()
            .is_some()
    );
}
