// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mirrored Resource
//!
//! The stored representation of one Kubernetes object reported by an agent.
//! The object payload stays opaque JSON; only the handful of metadata fields
//! used for identity and indexing are ever read from it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Mirror document shape and metadata accessors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label carrying the owning company of an object.
pub const COMPANY_LABEL: &str = "company";

/// Document field holding the owner key.
pub const OWNER_FIELD: &str = "agent_name";

/// Document field holding the mirrored object.
pub const OBJECT_FIELD: &str = "obj";

/// Kubernetes type information stamped on every mirrored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaTag {
    pub kind: &'static str,
    pub api_version: &'static str,
}

/// One mirrored object plus the agent that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirroredResource {
    pub obj: Value,
    #[serde(default)]
    pub agent_name: String,
}

impl MirroredResource {
    pub fn new(obj: Value, agent_name: impl Into<String>) -> Self {
        Self {
            obj,
            agent_name: agent_name.into(),
        }
    }

    /// Rebuilds a mirror from a stored document.
    pub fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(document)
    }

    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.obj
            .get("metadata")
            .and_then(|metadata| metadata.get(field))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    pub fn uid(&self) -> Option<&str> {
        self.metadata_str("uid")
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.obj
            .get("metadata")
            .and_then(|metadata| metadata.get("labels"))
            .and_then(|labels| labels.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Company label used by the agent index.
    pub fn company(&self) -> Option<&str> {
        self.label(COMPANY_LABEL)
    }

    /// Fills in `kind` and `apiVersion` when the payload does not carry them.
    ///
    /// Agents usually send bare objects on ADD; values already present in the
    /// payload are left untouched.
    pub fn stamp(&mut self, schema: SchemaTag) {
        if let Value::Object(obj) = &mut self.obj {
            stamp_missing(obj, "kind", schema.kind);
            stamp_missing(obj, "apiVersion", schema.api_version);
        }
    }
}

fn stamp_missing(obj: &mut Map<String, Value>, field: &str, value: &str) {
    let missing = match obj.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(existing)) => existing.is_empty(),
        Some(_) => false,
    };
    if missing {
        obj.insert(field.to_string(), Value::String(value.to_string()));
    }
}
