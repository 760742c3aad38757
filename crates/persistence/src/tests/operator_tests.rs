// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for operator accounts and login sessions.

use super::{create_admin, new_persistence, test_event};
use crate::{NewOperator, PersistenceError, ROLE_ADMIN, format_timestamp};
use time::{Duration, OffsetDateTime};

fn expiry_in(duration: Duration) -> String {
    format_timestamp(OffsetDateTime::now_utc() + duration).unwrap()
}

#[test]
fn test_create_operator_normalizes_login_and_hashes_password() {
    let mut persistence = new_persistence();

    let operator_id = create_admin(&mut persistence, "  alice ");

    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .unwrap();
    assert_eq!(operator.login_name, "ALICE");
    assert_eq!(operator.role, ROLE_ADMIN);
    assert!(!operator.is_disabled);
    assert_ne!(operator.password_hash, "CorrectHorse42!");
    assert!(
        persistence
            .verify_password("CorrectHorse42!", &operator.password_hash)
            .unwrap()
    );
    assert!(
        !persistence
            .verify_password("wrong", &operator.password_hash)
            .unwrap()
    );
}

#[test]
fn test_login_lookup_is_case_insensitive() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "Alice");

    let found = persistence.get_operator_by_login("aLiCe").unwrap().unwrap();
    assert_eq!(found.operator_id, operator_id);
    assert!(persistence.get_operator_by_login("bob").unwrap().is_none());
}

#[test]
fn test_duplicate_login_is_rejected() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "alice");

    let result = persistence.create_operator(
        &NewOperator {
            login_name: "ALICE",
            display_name: "Second Alice",
            password: "AnotherPass99!",
            role: ROLE_ADMIN,
            agency_id: None,
            must_change_password: false,
        },
        &test_event("CreateOperator", "operator"),
    );

    assert!(matches!(result, Err(PersistenceError::UniqueViolation(_))));
    assert_eq!(persistence.count_operators().unwrap(), 1);
}

#[test]
fn test_create_operator_records_linked_audit_event() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");

    let events = persistence.list_audit_events(Some("operator"), 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.entity_id, Some(operator_id));
    assert_eq!(events[0].event.action.name, "CreateOperator");
}

#[test]
fn test_disable_operator_revokes_sessions() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");
    create_admin(&mut persistence, "bob");

    persistence
        .create_session("token-1", operator_id, &expiry_in(Duration::hours(8)))
        .unwrap();
    persistence
        .create_session("token-2", operator_id, &expiry_in(Duration::hours(8)))
        .unwrap();

    persistence
        .disable_operator(operator_id, &test_event("DisableOperator", "operator"))
        .unwrap();

    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .unwrap();
    assert!(operator.is_disabled);
    assert!(operator.disabled_at.is_some());
    assert!(persistence.get_session_by_token("token-1").unwrap().is_none());
    assert!(persistence.get_session_by_token("token-2").unwrap().is_none());
    assert_eq!(persistence.count_active_admin_operators().unwrap(), 1);
}

#[test]
fn test_enable_operator_clears_disabled_state() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");

    persistence
        .disable_operator(operator_id, &test_event("DisableOperator", "operator"))
        .unwrap();
    persistence
        .enable_operator(operator_id, &test_event("EnableOperator", "operator"))
        .unwrap();

    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .unwrap();
    assert!(!operator.is_disabled);
    assert!(operator.disabled_at.is_none());
}

#[test]
fn test_disable_missing_operator_is_not_found_and_not_audited() {
    let mut persistence = new_persistence();

    let result = persistence.disable_operator(999, &test_event("DisableOperator", "operator"));

    assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    assert!(persistence.list_audit_events(None, 10).unwrap().is_empty());
}

#[test]
fn test_update_password_keeps_only_current_session() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");

    let current = persistence
        .create_session("current", operator_id, &expiry_in(Duration::hours(8)))
        .unwrap();
    persistence
        .create_session("other", operator_id, &expiry_in(Duration::hours(8)))
        .unwrap();

    persistence
        .update_password(
            operator_id,
            "BrandNewPass77!",
            Some(current),
            &test_event("ChangePassword", "operator"),
        )
        .unwrap();

    assert!(persistence.get_session_by_token("current").unwrap().is_some());
    assert!(persistence.get_session_by_token("other").unwrap().is_none());

    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .unwrap();
    assert!(!operator.must_change_password);
    assert!(
        persistence
            .verify_password("BrandNewPass77!", &operator.password_hash)
            .unwrap()
    );
}

#[test]
fn test_update_password_without_session_revokes_all() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");
    persistence
        .create_session("only", operator_id, &expiry_in(Duration::hours(8)))
        .unwrap();

    persistence
        .update_password(
            operator_id,
            "BrandNewPass77!",
            None,
            &test_event("ResetPassword", "operator"),
        )
        .unwrap();

    assert!(persistence.get_session_by_token("only").unwrap().is_none());
}

#[test]
fn test_delete_expired_sessions_only_removes_expired() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");

    persistence
        .create_session("expired", operator_id, &expiry_in(-Duration::hours(1)))
        .unwrap();
    persistence
        .create_session("live", operator_id, &expiry_in(Duration::hours(1)))
        .unwrap();

    let removed = persistence.delete_expired_sessions().unwrap();

    assert_eq!(removed, 1);
    assert!(persistence.get_session_by_token("expired").unwrap().is_none());
    assert!(persistence.get_session_by_token("live").unwrap().is_some());
}

#[test]
fn test_logout_deletes_session() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");
    let session_id = persistence
        .create_session("token", operator_id, &expiry_in(Duration::hours(1)))
        .unwrap();

    persistence.update_session_activity(session_id).unwrap();
    let session = persistence.get_session_by_token("token").unwrap().unwrap();
    assert_eq!(session.operator_id, operator_id);

    persistence.delete_session("token").unwrap();
    assert!(persistence.get_session_by_token("token").unwrap().is_none());
}

#[test]
fn test_update_last_login_sets_timestamp() {
    let mut persistence = new_persistence();
    let operator_id = create_admin(&mut persistence, "alice");

    persistence.update_last_login(operator_id).unwrap();

    let operator = persistence
        .get_operator_by_id(operator_id)
        .unwrap()
        .unwrap();
    assert!(operator.last_login_at.is_some());
}
