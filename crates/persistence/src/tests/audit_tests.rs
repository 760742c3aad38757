// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for the audit trail.

use super::{create_admin, create_agency, new_persistence, test_event};
use liverdesk_audit::{Action, Actor, AuditEvent, Cause};

#[test]
fn test_audit_event_round_trips_actor_and_details() {
    let mut persistence = new_persistence();
    let event = AuditEvent::new(
        Actor::operator(7, "ALICE", "Alice"),
        Cause::new(String::from("req-1"), String::from("POST /api/agencies")),
        Action::new(
            String::from("CreateAgency"),
            Some(String::from("code=ALPHA")),
        ),
        String::from("agency"),
        Some(3),
    );

    let event_id = persistence.record_audit_event(&event).unwrap();

    let events = persistence.list_audit_events(None, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, event_id);
    assert_eq!(events[0].event, event);
    assert!(!events[0].created_at.is_empty());
}

#[test]
fn test_audit_events_list_newest_first_with_limit() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");
    create_agency(&mut persistence, "ALPHA", "20");
    create_agency(&mut persistence, "BETA", "20");

    let all = persistence.list_audit_events(None, 10).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].event.action.name, "CreateAgency");
    assert_eq!(all[2].event.action.name, "CreateOperator");
    assert!(all[0].event_id > all[1].event_id);

    let limited = persistence.list_audit_events(None, 1).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].event_id, all[0].event_id);

    let agencies = persistence.list_audit_events(Some("agency"), 10).unwrap();
    assert_eq!(agencies.len(), 2);
}

#[test]
fn test_failed_mutation_leaves_no_audit_event() {
    let mut persistence = new_persistence();

    let result = persistence.enable_operator(404, &test_event("EnableOperator", "operator"));

    assert!(result.is_err());
    assert!(persistence.list_audit_events(None, 10).unwrap().is_empty());
}
