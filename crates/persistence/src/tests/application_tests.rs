// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Tests for application storage and optimistic locking.

use super::{create_admin, create_agency, new_persistence, sample_liver, test_event};
use crate::{
    ApplicationFilter, ApplicationTransition, NewApplication, Persistence, PersistenceError,
};
use liverdesk_domain::{ApplicationFormType, ApplicationStatus};

fn submit(persistence: &mut Persistence, form_type: ApplicationFormType, agency: Option<i64>) -> i64 {
    persistence
        .create_application(
            &NewApplication {
                form_type,
                applicant_name: String::from("Hana Sato"),
                applicant_email: Some(String::from("hana@example.com")),
                tiktok_handle: Some(String::from("hana_live")),
                tiktok_user_id: Some(String::from("700555")),
                agency_id: agency,
                payload: serde_json::json!({ "message": "Please review" }),
                submitted_by: None,
            },
            &test_event("SubmitApplication", "application"),
        )
        .unwrap()
}

fn transition(
    application_id: i64,
    expected_version: i32,
    from: ApplicationStatus,
    to: ApplicationStatus,
    reviewer: i64,
) -> ApplicationTransition {
    ApplicationTransition {
        application_id,
        expected_version,
        from,
        to,
        reviewer_operator_id: reviewer,
        review_note: Some(String::from("checked")),
    }
}

#[test]
fn test_new_application_starts_pending_at_version_one() {
    let mut persistence = new_persistence();
    let id = submit(&mut persistence, ApplicationFormType::Inquiry, None);

    let application = persistence.get_application(id).unwrap().unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.version, 1);
    assert_eq!(application.payload["message"], "Please review");
}

#[test]
fn test_transition_bumps_version_and_records_reviewer() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let id = submit(&mut persistence, ApplicationFormType::Inquiry, None);

    let version = persistence
        .transition_application(
            &transition(
                id,
                1,
                ApplicationStatus::Pending,
                ApplicationStatus::InReview,
                admin,
            ),
            &test_event("TransitionApplication", "application"),
        )
        .unwrap();

    assert_eq!(version, 2);
    let application = persistence.get_application(id).unwrap().unwrap();
    assert_eq!(application.status, ApplicationStatus::InReview);
    assert_eq!(application.reviewer_operator_id, Some(admin));
    assert_eq!(application.review_note.as_deref(), Some("checked"));
}

#[test]
fn test_stale_version_is_rejected() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let id = submit(&mut persistence, ApplicationFormType::Inquiry, None);

    persistence
        .transition_application(
            &transition(
                id,
                1,
                ApplicationStatus::Pending,
                ApplicationStatus::InReview,
                admin,
            ),
            &test_event("TransitionApplication", "application"),
        )
        .unwrap();

    let result = persistence.transition_application(
        &transition(
            id,
            1,
            ApplicationStatus::Pending,
            ApplicationStatus::Rejected,
            admin,
        ),
        &test_event("TransitionApplication", "application"),
    );

    assert!(matches!(
        result,
        Err(PersistenceError::StaleWrite {
            entity: "Application",
            expected_version: 1,
            ..
        })
    ));
    let application = persistence.get_application(id).unwrap().unwrap();
    assert_eq!(application.status, ApplicationStatus::InReview);
}

#[test]
fn test_transition_of_missing_application_is_not_found() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");

    let result = persistence.transition_application(
        &transition(
            77,
            1,
            ApplicationStatus::Pending,
            ApplicationStatus::InReview,
            admin,
        ),
        &test_event("TransitionApplication", "application"),
    );

    assert!(matches!(result, Err(PersistenceError::NotFound(_))));
}

#[test]
fn test_authorize_with_liver_creates_and_links_liver() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let agency = create_agency(&mut persistence, "ALPHA", "20");
    let id = submit(
        &mut persistence,
        ApplicationFormType::LiverRegistration,
        Some(agency),
    );

    let (version, liver_id) = persistence
        .authorize_application_with_liver(
            &transition(
                id,
                1,
                ApplicationStatus::Pending,
                ApplicationStatus::Authorized,
                admin,
            ),
            &sample_liver("hana_live", Some("700555"), Some(agency)),
            &test_event("TransitionApplication", "application"),
        )
        .unwrap();

    assert_eq!(version, 2);
    let application = persistence.get_application(id).unwrap().unwrap();
    assert_eq!(application.liver_id, Some(liver_id));
    assert_eq!(
        persistence.get_liver(liver_id).unwrap().unwrap().agency_id,
        Some(agency)
    );
}

#[test]
fn test_failed_authorization_does_not_leave_a_liver_behind() {
    let mut persistence = new_persistence();
    let admin = create_admin(&mut persistence, "admin");
    let id = submit(&mut persistence, ApplicationFormType::LiverRegistration, None);

    let result = persistence.authorize_application_with_liver(
        &transition(
            id,
            5,
            ApplicationStatus::Pending,
            ApplicationStatus::Authorized,
            admin,
        ),
        &sample_liver("hana_live", Some("700555"), None),
        &test_event("TransitionApplication", "application"),
    );

    assert!(matches!(result, Err(PersistenceError::StaleWrite { .. })));
    assert!(
        persistence
            .get_liver_by_tiktok_user_id("700555")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_list_applications_filters() {
    let mut persistence = new_persistence();
    let alpha = create_agency(&mut persistence, "ALPHA", "20");
    let inquiry = submit(&mut persistence, ApplicationFormType::Inquiry, Some(alpha));
    submit(&mut persistence, ApplicationFormType::Graduation, Some(alpha));
    submit(&mut persistence, ApplicationFormType::Inquiry, None);

    let filtered = persistence
        .list_applications(&ApplicationFilter {
            form_type: Some(ApplicationFormType::Inquiry),
            status: Some(ApplicationStatus::Pending),
            agency_ids: Some(vec![alpha]),
        })
        .unwrap();

    assert_eq!(
        filtered
            .iter()
            .map(|a| a.application_id)
            .collect::<Vec<_>>(),
        vec![inquiry]
    );
    assert_eq!(
        persistence
            .list_applications(&ApplicationFilter::default())
            .unwrap()
            .len(),
        3
    );
}
