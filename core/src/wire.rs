//! Shapes exchanged with the remote service and their translation to the
//! local domain types.
//!
//! The service keys its JSON with PascalCase (`Id`, `StackFileContent`) and
//! a few irregular names (`ID`, `SwarmID`, `jwt`). Each struct here spells the
//! remote names out explicitly; `From` impls move data across the boundary.

use serde::{Deserialize, Serialize};

use crate::types::{InputResourceControl, ResourceControl, Stack, StackVars, Swarm, Team};

#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub jwt: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSwarm {
    #[serde(rename = "ID")]
    pub id: String,
}

impl From<WireSwarm> for Swarm {
    fn from(wire: WireSwarm) -> Self {
        Swarm { id: wire.id }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireTeam {
    pub id: i64,
    pub name: String,
}

impl From<WireTeam> for Team {
    fn from(wire: WireTeam) -> Self {
        Team {
            id: wire.id,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireResourceControl {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireStack {
    pub id: i64,
    pub name: String,
    pub resource_control: WireResourceControl,
}

impl From<WireStack> for Stack {
    fn from(wire: WireStack) -> Self {
        Stack {
            id: wire.id,
            name: wire.name,
            resource_control: ResourceControl {
                id: wire.resource_control.id,
            },
        }
    }
}

/// Server-side stack filter, sent JSON-encoded in the `filters` query parameter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackFilter<'a> {
    pub swarm_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ResourceControlUpdate<'a> {
    pub administrators_only: bool,
    pub public: bool,
    pub teams: &'a [i64],
    pub users: &'a [i64],
}

impl<'a> From<&'a InputResourceControl> for ResourceControlUpdate<'a> {
    fn from(input: &'a InputResourceControl) -> Self {
        ResourceControlUpdate {
            administrators_only: input.administrators_only.unwrap_or(false),
            public: input.public.unwrap_or(false),
            teams: input.teams.as_deref().unwrap_or(&[]),
            users: input.users.as_deref().unwrap_or(&[]),
        }
    }
}

/// One stack variable. The service keeps these lowercase.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct EnvPair<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Flatten a variable map into the list form the service expects.
pub(crate) fn env_list(vars: &StackVars) -> Vec<EnvPair<'_>> {
    vars.iter()
        .map(|(name, value)| EnvPair { name, value })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackUpdateBody<'a> {
    pub stack_file_content: &'a str,
    pub env: Vec<EnvPair<'a>>,
    pub prune: bool,
    pub pull_image: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackCreateBody<'a> {
    pub name: &'a str,
    pub stack_file_content: &'a str,
    #[serde(rename = "SwarmID")]
    pub swarm_id: &'a str,
    pub env: Vec<EnvPair<'a>>,
}

/// Failure body returned alongside non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FailureBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_emits_every_key_once() {
        let vars: StackVars = [("A", "1"), ("B", "2"), ("C", "")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let env = env_list(&vars);
        assert_eq!(env.len(), vars.len());
        for (name, value) in &vars {
            let matches: Vec<_> = env.iter().filter(|pair| pair.name == name.as_str()).collect();
            assert_eq!(matches.len(), 1, "{name} appears once");
            assert_eq!(matches[0].value, value.as_str());
        }
    }

    #[test]
    fn env_list_of_empty_map_is_empty() {
        assert!(env_list(&StackVars::new()).is_empty());
    }

    #[test]
    fn resource_control_update_fills_defaults() {
        let input = InputResourceControl {
            id: 9,
            public: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(ResourceControlUpdate::from(&input)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"AdministratorsOnly": false, "Public": true, "Teams": [], "Users": []})
        );
    }

    #[test]
    fn create_body_uses_irregular_swarm_key() {
        let vars = StackVars::from([("A".to_string(), "1".to_string())]);
        let body = StackCreateBody {
            name: "n",
            stack_file_content: "doc",
            swarm_id: "sw1",
            env: env_list(&vars),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Name": "n",
                "StackFileContent": "doc",
                "SwarmID": "sw1",
                "Env": [{"name": "A", "value": "1"}]
            })
        );
    }

    #[test]
    fn wire_stack_maps_nested_resource_control() {
        let wire: WireStack =
            serde_json::from_str(r#"{"Id":7,"Name":"web","ResourceControl":{"Id":3},"Type":1}"#).unwrap();
        let stack = Stack::from(wire);
        assert_eq!(stack.id, 7);
        assert_eq!(stack.name, "web");
        assert_eq!(stack.resource_control.id, 3);
    }

    #[test]
    fn wire_stack_without_resource_control_is_rejected() {
        let result: Result<WireStack, _> = serde_json::from_str(r#"{"Id":7,"Name":"web"}"#);
        assert!(result.is_err());
    }
}
