// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

//! Audit trail types.
//!
//! Every successful mutation produces exactly one `AuditEvent` describing who
//! did it, why, what was done and which record was touched.

use serde::{Deserialize, Serialize};

/// The entity performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier of the actor, unique within `actor_type`.
    pub id: String,
    /// `"operator"` for logged-in users, `"system"` for background tasks.
    pub actor_type: String,
    /// Operator id when the actor is an operator.
    pub operator_id: Option<i64>,
    pub login_name: Option<String>,
    pub display_name: Option<String>,
}

impl Actor {
    #[must_use]
    pub const fn new(id: String, actor_type: String) -> Self {
        Self {
            id,
            actor_type,
            operator_id: None,
            login_name: None,
            display_name: None,
        }
    }

    /// Creates an actor for an authenticated operator.
    #[must_use]
    pub fn operator(operator_id: i64, login_name: &str, display_name: &str) -> Self {
        Self {
            id: operator_id.to_string(),
            actor_type: String::from("operator"),
            operator_id: Some(operator_id),
            login_name: Some(login_name.to_string()),
            display_name: Some(display_name.to_string()),
        }
    }

    /// Creates an actor for work the server performs on its own.
    #[must_use]
    pub fn system(task: &str) -> Self {
        Self::new(task.to_string(), String::from("system"))
    }
}

/// The reason or trigger for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// Request or event identifier.
    pub id: String,
    pub description: String,
}

impl Cause {
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// What was done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action name, e.g. `CreateAgency` or `ImportReport`.
    pub name: String,
    pub details: Option<String>,
}

impl Action {
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// An immutable record of one state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: Actor,
    pub cause: Cause,
    pub action: Action,
    /// Kind of record touched, e.g. `agency`, `report`, `invoice`.
    pub entity_type: String,
    /// Id of the record touched, when it has one.
    pub entity_id: Option<i64>,
}

impl AuditEvent {
    #[must_use]
    pub const fn new(
        actor: Actor,
        cause: Cause,
        action: Action,
        entity_type: String,
        entity_id: Option<i64>,
    ) -> Self {
        Self {
            actor,
            cause,
            action,
            entity_type,
            entity_id,
        }
    }

    /// Returns a copy of the event pointing at `entity_id`.
    ///
    /// Used when the id is only known after the insert that the event
    /// describes.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: i64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> AuditEvent {
        AuditEvent::new(
            Actor::operator(7, "ADMIN", "Admin User"),
            Cause::new(String::from("req-1"), String::from("Agency onboarding")),
            Action::new(String::from("CreateAgency"), Some(String::from("code=STAR"))),
            String::from("agency"),
            None,
        )
    }

    #[test]
    fn test_operator_actor_carries_identity() {
        let actor = Actor::operator(7, "ADMIN", "Admin User");
        assert_eq!(actor.id, "7");
        assert_eq!(actor.actor_type, "operator");
        assert_eq!(actor.operator_id, Some(7));
        assert_eq!(actor.login_name.as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_system_actor_has_no_operator() {
        let actor = Actor::system("session-cleanup");
        assert_eq!(actor.actor_type, "system");
        assert!(actor.operator_id.is_none());
        assert!(actor.display_name.is_none());
    }

    #[test]
    fn test_with_entity_id_sets_only_the_id() {
        let event = sample_event();
        let linked = event.clone().with_entity_id(42);
        assert_eq!(linked.entity_id, Some(42));
        assert_eq!(linked.action, event.action);
        assert_eq!(linked.actor, event.actor);
    }

    #[test]
    fn test_event_serializes_nested_fields() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["actor"]["login_name"], "ADMIN");
        assert_eq!(json["action"]["name"], "CreateAgency");
        assert_eq!(json["entity_type"], "agency");
        assert!(json["entity_id"].is_null());
    }
}
