// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Kube change events as emitted by the lighthouse agents.
//!
//! ```json
//! {
//!   "header": { "command": "UPDATE", "extras": { "object": "pod", "agent": "a1" } },
//!   "body": { "old_k8s_obj": { ... }, "new_k8s_obj": { ... } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `extras` key carrying the resource kind tag
pub const EXTRA_OBJECT: &str = "object";
/// `extras` key carrying the owning agent name
pub const EXTRA_AGENT: &str = "agent";
/// `extras` key some agents send instead of `agent`
pub const EXTRA_CLUSTER_ID: &str = "kubeClusterId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Add,
    Update,
    Delete,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "ADD",
            Command::Update => "UPDATE",
            Command::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    pub command: Command,
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

/// Change notification for one Kubernetes object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub header: EventHeader,
    #[serde(default)]
    pub body: Value,
}

impl ChangeEvent {
    pub fn new(command: Command, kind_tag: &str, agent: &str, body: Value) -> Self {
        let extras = HashMap::from([
            (EXTRA_OBJECT.to_string(), kind_tag.to_string()),
            (EXTRA_AGENT.to_string(), agent.to_string()),
        ]);
        Self {
            header: EventHeader { command, extras },
            body,
        }
    }

    pub fn command(&self) -> Command {
        self.header.command
    }

    /// Resource kind tag (`extras.object`).
    pub fn kind_tag(&self) -> Option<&str> {
        self.extra(EXTRA_OBJECT)
    }

    /// Owning agent, falling back to the reported cluster id.
    pub fn owner(&self) -> Option<&str> {
        self.extra(EXTRA_AGENT).or_else(|| self.extra(EXTRA_CLUSTER_ID))
    }

    fn extra(&self, key: &str) -> Option<&str> {
        self.header
            .extras
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// UPDATE body: the object before and after the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBody {
    pub old_k8s_obj: Value,
    pub new_k8s_obj: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decodes() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "header": { "command": "ADD", "extras": { "object": "pod", "agent": "a1", "trace": "x" } },
            "body": { "metadata": { "name": "web-1" } }
        }))
        .unwrap();

        assert_eq!(event.command(), Command::Add);
        assert_eq!(event.kind_tag(), Some("pod"));
        assert_eq!(event.owner(), Some("a1"));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result: Result<ChangeEvent, _> = serde_json::from_value(json!({
            "header": { "command": "PATCH", "extras": {} },
            "body": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_owner_falls_back_to_cluster_id() {
        let mut event = ChangeEvent::new(Command::Delete, "pod", "", json!({}));
        assert_eq!(event.owner(), None);

        event
            .header
            .extras
            .insert(EXTRA_CLUSTER_ID.to_string(), "cluster-7".to_string());
        assert_eq!(event.owner(), Some("cluster-7"));
    }

    #[test]
    fn test_extras_are_trimmed() {
        let event = ChangeEvent::new(Command::Add, " pod ", " a1 ", json!({}));
        assert_eq!(event.owner(), Some("a1"));
        assert_eq!(event.kind_tag(), Some("pod"));
    }

    #[test]
    fn test_update_body_requires_both_objects() {
        let ok: Result<UpdateBody, _> =
            serde_json::from_value(json!({"old_k8s_obj": {}, "new_k8s_obj": {}}));
        assert!(ok.is_ok());

        let missing: Result<UpdateBody, _> = serde_json::from_value(json!({"new_k8s_obj": {}}));
        assert!(missing.is_err());
    }
}
