// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for liver roster persistence.

use super::{create_agency, create_liver, new_persistence, sample_liver, test_event};
use crate::{LiverFilter, PersistenceError};
use liverdesk_domain::LiverStatus;

#[test]
fn test_find_liver_by_handle_ignores_case_and_at_sign() {
    let mut persistence = new_persistence();
    let liver_id = create_liver(&mut persistence, "SakuraLive", Some("700123"), None);

    let by_handle = persistence.find_liver_by_handle("@sakuralive").unwrap();
    assert_eq!(by_handle.map(|l| l.liver_id), Some(liver_id));

    let by_user_id = persistence.get_liver_by_tiktok_user_id(" 700123 ").unwrap();
    assert_eq!(by_user_id.map(|l| l.liver_id), Some(liver_id));

    assert!(persistence.find_liver_by_handle("unknown").unwrap().is_none());
}

#[test]
fn test_duplicate_tiktok_user_id_is_rejected() {
    let mut persistence = new_persistence();
    create_liver(&mut persistence, "first", Some("700123"), None);

    let result = persistence.create_liver(
        &sample_liver("second", Some("700123"), None),
        &test_event("CreateLiver", "liver"),
    );

    assert!(matches!(result, Err(PersistenceError::UniqueViolation(_))));
}

#[test]
fn test_livers_without_user_id_may_coexist() {
    let mut persistence = new_persistence();
    create_liver(&mut persistence, "first", None, None);
    create_liver(&mut persistence, "second", None, None);

    assert_eq!(
        persistence.list_livers(&LiverFilter::default()).unwrap().len(),
        2
    );
}

#[test]
fn test_list_livers_filters_by_agency_and_status() {
    let mut persistence = new_persistence();
    let alpha = create_agency(&mut persistence, "ALPHA", "20");
    let beta = create_agency(&mut persistence, "BETA", "10");
    let a1 = create_liver(&mut persistence, "a1", None, Some(alpha));
    let a2 = create_liver(&mut persistence, "a2", None, Some(alpha));
    create_liver(&mut persistence, "b1", None, Some(beta));

    persistence
        .bulk_update_liver_status(
            &[a2],
            LiverStatus::Paused,
            &test_event("BulkUpdateLiverStatus", "liver"),
        )
        .unwrap();

    let alpha_active = persistence
        .list_livers(&LiverFilter {
            agency_ids: Some(vec![alpha]),
            status: Some(LiverStatus::Active),
        })
        .unwrap();
    assert_eq!(
        alpha_active.iter().map(|l| l.liver_id).collect::<Vec<_>>(),
        vec![a1]
    );

    let none_visible = persistence
        .list_livers(&LiverFilter {
            agency_ids: Some(Vec::new()),
            status: None,
        })
        .unwrap();
    assert!(none_visible.is_empty());
}

#[test]
fn test_bulk_status_update_reports_changed_count() {
    let mut persistence = new_persistence();
    let first = create_liver(&mut persistence, "first", None, None);
    let second = create_liver(&mut persistence, "second", None, None);

    let changed = persistence
        .bulk_update_liver_status(
            &[first, second, 999],
            LiverStatus::Graduated,
            &test_event("BulkUpdateLiverStatus", "liver"),
        )
        .unwrap();

    assert_eq!(changed, 2);
    let liver = persistence.get_liver(first).unwrap().unwrap();
    assert_eq!(liver.status, LiverStatus::Graduated);

    let none = persistence
        .bulk_update_liver_status(
            &[],
            LiverStatus::Active,
            &test_event("BulkUpdateLiverStatus", "liver"),
        )
        .unwrap();
    assert_eq!(none, 0);
}

#[test]
fn test_update_liver_moves_agency() {
    let mut persistence = new_persistence();
    let alpha = create_agency(&mut persistence, "ALPHA", "20");
    let beta = create_agency(&mut persistence, "BETA", "10");
    let liver_id = create_liver(&mut persistence, "mover", None, Some(alpha));

    let mut update = sample_liver("mover", None, Some(beta));
    update.notes = Some(String::from("Transferred"));
    persistence
        .update_liver(liver_id, &update, &test_event("UpdateLiver", "liver"))
        .unwrap();

    let liver = persistence.get_liver(liver_id).unwrap().unwrap();
    assert_eq!(liver.agency_id, Some(beta));
    assert_eq!(liver.notes.as_deref(), Some("Transferred"));
}

#[test]
fn test_liver_with_unknown_agency_is_rejected() {
    let mut persistence = new_persistence();

    let result = persistence.create_liver(
        &sample_liver("orphan", None, Some(404)),
        &test_event("CreateLiver", "liver"),
    );

    assert!(matches!(
        result,
        Err(PersistenceError::ForeignKeyViolation(_) | PersistenceError::DatabaseError(_))
    ));
}
