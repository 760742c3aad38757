// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::handlers::livers;
use crate::tests::helpers::{
    create_admin, create_agency, create_agency_operator, create_liver, create_test_cause,
    liver_fields, new_persistence,
};
use crate::{ApiError, BulkLiverStatusRequest, ListLiversQuery};

fn all_livers() -> ListLiversQuery {
    ListLiversQuery {
        agency_id: None,
        status: None,
    }
}

#[test]
fn test_create_liver_normalizes_handle() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let mut fields = liver_fields("  @Sakura_Live ", None);
    fields.tiktok_user_id = Some(String::from(" 7012345678 "));
    fields.joined_at = Some(String::from("2024-04-01"));
    let liver = livers::create_liver(&mut persistence, &fields, &admin, create_test_cause())
        .unwrap();

    assert_eq!(liver.tiktok_handle, "Sakura_Live");
    assert_eq!(liver.tiktok_user_id.as_deref(), Some("7012345678"));
    assert_eq!(liver.status, "active");
    assert_eq!(liver.joined_at.as_deref(), Some("2024-04-01"));
    assert_eq!(liver.agency_id, None);
}

#[test]
fn test_create_liver_rejects_bad_fields() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let mut fields = liver_fields("sakura", None);
    fields.tiktok_user_id = Some(String::from("70x1"));
    let err = livers::create_liver(&mut persistence, &fields, &admin, create_test_cause())
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "tiktok_user_id"
    ));

    let mut fields = liver_fields("sakura", None);
    fields.joined_at = Some(String::from("April 1st"));
    let err = livers::create_liver(&mut persistence, &fields, &admin, create_test_cause())
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "joined_at"
    ));
}

#[test]
fn test_duplicate_handle_conflicts() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    create_liver(&mut persistence, &admin, "sakura", None, None);

    let err = livers::create_liver(
        &mut persistence,
        &liver_fields("@sakura", None),
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[test]
fn test_agency_operator_defaults_to_own_agency() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");

    let liver = livers::create_liver(
        &mut persistence,
        &liver_fields("sakura", None),
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(liver.agency_id, Some(alpha));
}

#[test]
fn test_agency_operator_cannot_touch_other_agencies() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let beta = create_agency(&mut persistence, &admin, "BETA", "15", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");
    let beta_liver = create_liver(&mut persistence, &admin, "beta_star", None, Some(beta));

    let err = livers::create_liver(
        &mut persistence,
        &liver_fields("sneaky", Some(beta)),
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));

    let err = livers::update_liver(
        &mut persistence,
        beta_liver,
        &liver_fields("beta_star", None),
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));

    let err = livers::list_livers(
        &mut persistence,
        &ListLiversQuery {
            agency_id: Some(beta),
            status: None,
        },
        &alpha_actor,
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
}

#[test]
fn test_list_livers_is_scoped() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let alpha_child = create_agency(&mut persistence, &admin, "ALPHAJR", "10", Some(alpha));
    let beta = create_agency(&mut persistence, &admin, "BETA", "15", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");

    create_liver(&mut persistence, &admin, "alpha_one", None, Some(alpha));
    create_liver(&mut persistence, &admin, "alpha_two", None, Some(alpha_child));
    create_liver(&mut persistence, &admin, "beta_one", None, Some(beta));
    create_liver(&mut persistence, &admin, "free_agent", None, None);

    let visible = livers::list_livers(&mut persistence, &all_livers(), &alpha_actor).unwrap();
    let mut handles: Vec<String> = visible
        .livers
        .into_iter()
        .map(|l| l.tiktok_handle)
        .collect();
    handles.sort();
    assert_eq!(handles, vec!["alpha_one", "alpha_two"]);

    let everything = livers::list_livers(&mut persistence, &all_livers(), &admin).unwrap();
    assert_eq!(everything.livers.len(), 4);
}

#[test]
fn test_update_liver_keeps_agency_and_status() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");
    let liver_id = create_liver(&mut persistence, &alpha_actor, "sakura", None, None);

    livers::bulk_update_liver_status(
        &mut persistence,
        &BulkLiverStatusRequest {
            liver_ids: vec![liver_id],
            status: String::from("paused"),
        },
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap();

    let mut fields = liver_fields("sakura", None);
    fields.display_name = String::from("Sakura Renamed");
    let updated =
        livers::update_liver(&mut persistence, liver_id, &fields, &alpha_actor, create_test_cause())
            .unwrap();
    assert_eq!(updated.display_name, "Sakura Renamed");
    assert_eq!(updated.agency_id, Some(alpha));
    assert_eq!(updated.status, "paused");
}

#[test]
fn test_bulk_update_liver_status() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let first = create_liver(&mut persistence, &admin, "first", None, Some(alpha));
    let second = create_liver(&mut persistence, &admin, "second", None, Some(alpha));

    let response = livers::bulk_update_liver_status(
        &mut persistence,
        &BulkLiverStatusRequest {
            liver_ids: vec![second, first, second],
            status: String::from("graduated"),
        },
        &admin,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(response.updated, 2);

    let graduated = livers::list_livers(
        &mut persistence,
        &ListLiversQuery {
            agency_id: None,
            status: Some(String::from("graduated")),
        },
        &admin,
    )
    .unwrap();
    assert_eq!(graduated.livers.len(), 2);
}

#[test]
fn test_bulk_update_is_all_or_nothing() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let beta = create_agency(&mut persistence, &admin, "BETA", "15", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");
    let own = create_liver(&mut persistence, &admin, "own", None, Some(alpha));
    let foreign = create_liver(&mut persistence, &admin, "foreign", None, Some(beta));

    let err = livers::bulk_update_liver_status(
        &mut persistence,
        &BulkLiverStatusRequest {
            liver_ids: vec![own, foreign],
            status: String::from("terminated"),
        },
        &alpha_actor,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));

    let liver = persistence.get_liver(own).unwrap().unwrap();
    assert_eq!(liver.status.as_str(), "active");

    let err = livers::bulk_update_liver_status(
        &mut persistence,
        &BulkLiverStatusRequest {
            liver_ids: Vec::new(),
            status: String::from("paused"),
        },
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput { .. }));
}
