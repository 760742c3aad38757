// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use time::Duration;

use crate::handlers::{agencies, auth};
use crate::tests::helpers::{
    TEST_PASSWORD, agency_fields, create_admin, create_test_cause, load_actor, new_persistence,
};
use crate::{
    AgencyLoginRequest, ApiError, AuthenticationService, ChangePasswordRequest,
    CreateAgencyRequest, LoginRequest,
};

fn login_request(login_name: &str, password: &str) -> LoginRequest {
    LoginRequest {
        login_name: login_name.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn test_login_returns_token_and_capabilities() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");

    let response = auth::login(
        &mut persistence,
        &login_request("admin", TEST_PASSWORD),
        Duration::days(1),
    )
    .unwrap();

    assert_eq!(response.session_token.len(), 64);
    assert!(response.capabilities.can_manage_agencies.is_allowed());
    assert!(response.capabilities.can_issue_invoices.is_allowed());
    assert!(!response.capabilities.must_change_password);

    let (actor, operator) =
        AuthenticationService::validate_session(&mut persistence, &response.session_token)
            .unwrap();
    assert_eq!(actor.login_name, "admin");
    assert!(operator.last_login_at.is_some());
}

#[test]
fn test_login_rejects_wrong_password() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");

    let err = auth::login(
        &mut persistence,
        &login_request("admin", "not-the-password"),
        Duration::days(1),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
}

#[test]
fn test_login_rejects_unknown_operator() {
    let mut persistence = new_persistence();

    let err = auth::login(
        &mut persistence,
        &login_request("ghost", TEST_PASSWORD),
        Duration::days(1),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
}

#[test]
fn test_expired_session_is_rejected() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");

    let response = auth::login(
        &mut persistence,
        &login_request("admin", TEST_PASSWORD),
        Duration::seconds(-1),
    )
    .unwrap();

    assert!(
        AuthenticationService::validate_session(&mut persistence, &response.session_token)
            .is_err()
    );
}

#[test]
fn test_logout_invalidates_session() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");
    let response = auth::login(
        &mut persistence,
        &login_request("admin", TEST_PASSWORD),
        Duration::days(1),
    )
    .unwrap();

    auth::logout(&mut persistence, &response.session_token).unwrap();

    assert!(
        AuthenticationService::validate_session(&mut persistence, &response.session_token)
            .is_err()
    );
}

#[test]
fn test_provisioned_login_must_change_password() {
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
    let provisioned = created.login.unwrap();

    let response = auth::login(
        &mut persistence,
        &login_request("alpha-ops", &provisioned.temporary_password),
        Duration::days(1),
    )
    .unwrap();
    assert!(response.capabilities.must_change_password);
    assert!(!response.capabilities.can_manage_livers.is_allowed());
    assert_eq!(response.operator.agency_id, Some(created.agency.agency_id));

    let (actor, operator) =
        AuthenticationService::validate_session(&mut persistence, &response.session_token)
            .unwrap();
    auth::change_password(
        &mut persistence,
        &ChangePasswordRequest {
            current_password: provisioned.temporary_password.clone(),
            new_password: String::from("Fresh-Start-2024"),
            new_password_confirmation: String::from("Fresh-Start-2024"),
        },
        &actor,
        &operator,
        create_test_cause(),
    )
    .unwrap();

    let (actor, operator) = load_actor(&mut persistence, provisioned.operator_id);
    let me = auth::whoami(&actor, &operator);
    assert!(!me.capabilities.must_change_password);
    assert!(me.capabilities.can_manage_livers.is_allowed());
    assert!(!me.capabilities.can_manage_agencies.is_allowed());
}

#[test]
fn test_change_password_revokes_other_sessions() {
    let mut persistence = new_persistence();
    create_admin(&mut persistence, "admin");

    let first = auth::login(
        &mut persistence,
        &login_request("admin", TEST_PASSWORD),
        Duration::days(1),
    )
    .unwrap();
    let second = auth::login(
        &mut persistence,
        &login_request("admin", TEST_PASSWORD),
        Duration::days(1),
    )
    .unwrap();

    let (actor, operator) =
        AuthenticationService::validate_session(&mut persistence, &first.session_token).unwrap();
    auth::change_password(
        &mut persistence,
        &ChangePasswordRequest {
            current_password: TEST_PASSWORD.to_string(),
            new_password: String::from("Another-Secret-77"),
            new_password_confirmation: String::from("Another-Secret-77"),
        },
        &actor,
        &operator,
        create_test_cause(),
    )
    .unwrap();

    assert!(
        AuthenticationService::validate_session(&mut persistence, &first.session_token).is_ok()
    );
    assert!(
        AuthenticationService::validate_session(&mut persistence, &second.session_token).is_err()
    );
    assert!(
        auth::login(
            &mut persistence,
            &login_request("admin", "Another-Secret-77"),
            Duration::days(1),
        )
        .is_ok()
    );
}

#[test]
fn test_change_password_requires_current_password() {
    let mut persistence = new_persistence();
    let (actor, operator) = create_admin(&mut persistence, "admin");

    let err = auth::change_password(
        &mut persistence,
        &ChangePasswordRequest {
            current_password: String::from("wrong-password"),
            new_password: String::from("Another-Secret-77"),
            new_password_confirmation: String::from("Another-Secret-77"),
        },
        &actor,
        &operator,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
}

#[test]
fn test_change_password_enforces_policy() {
    let mut persistence = new_persistence();
    let (actor, operator) = create_admin(&mut persistence, "admin");

    let err = auth::change_password(
        &mut persistence,
        &ChangePasswordRequest {
            current_password: TEST_PASSWORD.to_string(),
            new_password: String::from("short"),
            new_password_confirmation: String::from("short"),
        },
        &actor,
        &operator,
        create_test_cause(),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::PasswordPolicyViolation { .. }));
}
