//! Domain types returned to and accepted from callers.
//!
//! # Design
//! These are the local shapes. They serialize with camelCase keys so callers
//! can load inputs from JSON, but they never go on the wire directly: the
//! service uses a different casing convention and every boundary crossing goes
//! through the types in `wire`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cluster identity for an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Swarm {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// Identity of the access-control record attached to a stack.
///
/// Only ever populated from service responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceControl {
    pub id: i64,
}

/// A stack as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: i64,
    pub name: String,
    pub resource_control: ResourceControl,
}

/// Stack variables, name to value.
pub type StackVars = BTreeMap<String, String>;

/// Payload for creating a stack on the swarm behind `endpoint_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputStack {
    pub endpoint_id: i64,
    pub name: String,
    /// The stack definition document, e.g. compose file text.
    pub stack: String,
    #[serde(default)]
    pub vars: StackVars,
}

/// Payload for replacing the definition of an existing stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStack {
    pub id: i64,
    pub endpoint_id: i64,
    pub stack: String,
    #[serde(default)]
    pub vars: StackVars,
    /// Remove services no longer present in the document.
    #[serde(default)]
    pub prune: bool,
}

/// Write payload for an access-control record.
///
/// Every field except `id` is optional; omitted fields are sent as
/// `false` or an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputResourceControl {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrators_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_uses_camel_case_keys() {
        let stack = Stack {
            id: 7,
            name: "web".to_string(),
            resource_control: ResourceControl { id: 3 },
        };
        let json = serde_json::to_value(&stack).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "name": "web", "resourceControl": {"id": 3}}));
    }

    #[test]
    fn resource_control_input_fields_are_optional() {
        let input: InputResourceControl = serde_json::from_str(r#"{"id":4,"public":true}"#).unwrap();
        assert_eq!(input.id, 4);
        assert_eq!(input.public, Some(true));
        assert!(input.administrators_only.is_none());
        assert!(input.teams.is_none());
        assert!(input.users.is_none());
    }

    #[test]
    fn patch_stack_defaults_prune_and_vars() {
        let patch: PatchStack =
            serde_json::from_str(r#"{"id":1,"endpointId":2,"stack":"version: '3'"}"#).unwrap();
        assert!(!patch.prune);
        assert!(patch.vars.is_empty());
    }

    #[test]
    fn input_stack_rejects_missing_name() {
        let result: Result<InputStack, _> = serde_json::from_str(r#"{"endpointId":1,"stack":"doc"}"#);
        assert!(result.is_err());
    }
}
