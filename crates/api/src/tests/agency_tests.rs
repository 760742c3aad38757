// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use liverdesk_domain::Decimal;

use crate::handlers::{agencies, operators};
use crate::tests::helpers::{
    agency_fields, create_admin, create_agency, create_agency_operator, create_liver,
    create_test_cause, new_persistence,
};
use crate::{AgencyLoginRequest, ApiError, CreateAgencyRequest};

#[test]
fn test_create_agency_normalizes_fields() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let mut fields = agency_fields(" alpha ", "20", None);
    fields.name = String::from("  Alpha Productions  ");
    fields.contact_email = Some(String::from(" billing@alpha.example "));
    let created = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: fields,
            login: None,
        },
        &admin,
        create_test_cause(),
    )
    .unwrap();

    assert_eq!(created.agency.code, "ALPHA");
    assert_eq!(created.agency.name, "Alpha Productions");
    assert_eq!(
        created.agency.contact_email.as_deref(),
        Some("billing@alpha.example")
    );
    assert!(created.agency.is_invoice_registered);
    assert!(created.login.is_none());
}

#[test]
fn test_create_agency_with_login_provisions_operator() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let created = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: agency_fields("ALPHA", "20", None),
            login: Some(AgencyLoginRequest {
                login_name: String::from("alpha-ops"),
                display_name: String::from("Alpha Operations"),
            }),
        },
        &admin,
        create_test_cause(),
    )
    .unwrap();

    let login = created.login.unwrap();
    assert_eq!(login.login_name, "alpha-ops");
    assert_eq!(
        login.temporary_password.len(),
        crate::TEMPORARY_PASSWORD_LENGTH
    );

    let operator = persistence
        .get_operator_by_id(login.operator_id)
        .unwrap()
        .unwrap();
    assert_eq!(operator.agency_id, Some(created.agency.agency_id));
    assert!(operator.must_change_password);
}

#[test]
fn test_create_agency_requires_admin() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let agency_id = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let (agency_actor, _) = create_agency_operator(&mut persistence, &admin, agency_id, "alpha");

    let err = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: agency_fields("BETA", "10", Some(agency_id)),
            login: None,
        },
        &agency_actor,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
}

#[test]
fn test_duplicate_code_conflicts() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    create_agency(&mut persistence, &admin, "ALPHA", "20", None);

    let err = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: agency_fields("alpha", "15", None),
            login: None,
        },
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));
}

#[test]
fn test_invalid_commission_rate_rejected() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let err = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: agency_fields("ALPHA", "120", None),
            login: None,
        },
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "commission_rate"
    ));
}

#[test]
fn test_missing_parent_rejected() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");

    let err = agencies::create_agency(
        &mut persistence,
        &CreateAgencyRequest {
            agency: agency_fields("ALPHA", "20", Some(999)),
            login: None,
        },
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidInput { ref field, .. } if field == "parent_agency_id"
    ));
}

#[test]
fn test_update_rejects_circular_hierarchy() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let parent = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let child = create_agency(&mut persistence, &admin, "BETA", "10", Some(parent));

    let err = agencies::update_agency(
        &mut persistence,
        parent,
        &agency_fields("ALPHA", "20", Some(child)),
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "agency_hierarchy"
    ));

    let err = agencies::update_agency(
        &mut persistence,
        parent,
        &agency_fields("ALPHA", "20", Some(parent)),
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::DomainRuleViolation { .. }));
}

#[test]
fn test_update_agency_changes_rate() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let agency_id = create_agency(&mut persistence, &admin, "ALPHA", "20", None);

    let updated = agencies::update_agency(
        &mut persistence,
        agency_id,
        &agency_fields("ALPHA", "25.5", None),
        &admin,
        create_test_cause(),
    )
    .unwrap();
    assert_eq!(updated.commission_rate, Decimal::new(255, 1));
}

#[test]
fn test_agency_operator_sees_only_subtree() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let alpha = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let alpha_child = create_agency(&mut persistence, &admin, "ALPHAJR", "10", Some(alpha));
    let beta = create_agency(&mut persistence, &admin, "BETA", "15", None);
    let (alpha_actor, _) = create_agency_operator(&mut persistence, &admin, alpha, "alpha");

    let visible = agencies::list_agencies(&mut persistence, &alpha_actor).unwrap();
    let mut ids: Vec<i64> = visible.agencies.iter().map(|a| a.agency_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![alpha, alpha_child]);

    assert!(agencies::get_agency(&mut persistence, alpha_child, &alpha_actor).is_ok());
    let err = agencies::get_agency(&mut persistence, beta, &alpha_actor).unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));

    let all = agencies::list_agencies(&mut persistence, &admin).unwrap();
    assert_eq!(all.agencies.len(), 3);
}

#[test]
fn test_delete_agency_detaches_operators() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let agency_id = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let (_, operator) = create_agency_operator(&mut persistence, &admin, agency_id, "alpha");

    let response =
        agencies::delete_agency(&mut persistence, agency_id, &admin, create_test_cause()).unwrap();
    assert_eq!(response.detached_operator_ids, vec![operator.operator_id]);

    let detached = persistence
        .get_operator_by_id(operator.operator_id)
        .unwrap()
        .unwrap();
    assert!(detached.is_disabled);
    assert_eq!(detached.agency_id, None);
    assert!(persistence.get_agency(agency_id).unwrap().is_none());

    let err = operators::enable_operator(
        &mut persistence,
        operator.operator_id,
        &admin,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DomainRuleViolation { ref rule, .. } if rule == "detached_agency_login"
    ));
}

#[test]
fn test_delete_referenced_agency_conflicts() {
    let mut persistence = new_persistence();
    let (admin, _) = create_admin(&mut persistence, "admin");
    let parent = create_agency(&mut persistence, &admin, "ALPHA", "20", None);
    let child = create_agency(&mut persistence, &admin, "BETA", "10", Some(parent));
    create_liver(&mut persistence, &admin, "beta_star", None, Some(child));

    let err = agencies::delete_agency(&mut persistence, parent, &admin, create_test_cause())
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));

    let err = agencies::delete_agency(&mut persistence, child, &admin, create_test_cause())
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict { .. }));
}
