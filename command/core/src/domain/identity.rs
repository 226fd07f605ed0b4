// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identity Resolver
//!
//! Per-kind rules that compute the natural key used to locate "the" stored
//! document for an object. Every key is scoped by the owning agent.

use crate::domain::mirror::{MirroredResource, OWNER_FIELD};
use crate::domain::repository::DocumentFilter;

const NAME_PATH: &str = "obj.metadata.name";
const NAMESPACE_PATH: &str = "obj.metadata.namespace";
const UID_PATH: &str = "obj.metadata.uid";

/// How a kind identifies its objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    /// name + namespace + owner
    NameNamespace,
    /// name + owner (cluster-scoped kinds)
    Name,
    /// uid + owner
    Uid,
}

/// Whether a kind lives inside a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

/// Resolved identity key: ordered (document path, value) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    fields: Vec<(&'static str, String)>,
}

impl IdentityKey {
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Store filter selecting the document with this identity.
    pub fn to_filter(&self) -> DocumentFilter {
        self.fields
            .iter()
            .fold(DocumentFilter::new(), |filter, (path, value)| {
                filter.eq(*path, value.clone())
            })
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|(path, value)| format!("{}={}", path, value))
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("object has no metadata.{0}")]
    MissingField(&'static str),

    #[error("object has no owning agent")]
    MissingOwner,
}

impl IdentityRule {
    /// Computes the identity key of a mirror.
    pub fn resolve(&self, mirror: &MirroredResource) -> Result<IdentityKey, IdentityError> {
        let mut fields = Vec::with_capacity(3);
        match self {
            IdentityRule::NameNamespace => {
                fields.push((NAME_PATH, required(mirror.name(), "name")?));
                fields.push((NAMESPACE_PATH, required(mirror.namespace(), "namespace")?));
            }
            IdentityRule::Name => {
                fields.push((NAME_PATH, required(mirror.name(), "name")?));
            }
            IdentityRule::Uid => {
                fields.push((UID_PATH, required(mirror.uid(), "uid")?));
            }
        }
        if mirror.agent_name.is_empty() {
            return Err(IdentityError::MissingOwner);
        }
        fields.push((OWNER_FIELD, mirror.agent_name.clone()));
        Ok(IdentityKey { fields })
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, IdentityError> {
    value
        .map(str::to_string)
        .ok_or(IdentityError::MissingField(field))
}

/// Filter over every document an agent owns, optionally narrowed to a namespace.
pub fn owner_filter(owner: Option<&str>, namespace: Option<&str>) -> DocumentFilter {
    let mut filter = DocumentFilter::new();
    if let Some(owner) = owner {
        filter = filter.eq(OWNER_FIELD, owner);
    }
    if let Some(namespace) = namespace {
        filter = filter.eq(NAMESPACE_PATH, namespace);
    }
    filter
}

/// Filter for a single object addressed by name (and namespace) under an agent.
pub fn name_filter(owner: &str, name: &str, namespace: Option<&str>) -> DocumentFilter {
    let mut filter = DocumentFilter::new().eq(NAME_PATH, name);
    if let Some(namespace) = namespace {
        filter = filter.eq(NAMESPACE_PATH, namespace);
    }
    filter.eq(OWNER_FIELD, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(name: &str, namespace: &str, agent: &str) -> MirroredResource {
        MirroredResource::new(
            json!({"metadata": {"name": name, "namespace": namespace, "uid": "u-1"}}),
            agent,
        )
    }

    #[test]
    fn test_name_namespace_key() {
        let key = IdentityRule::NameNamespace.resolve(&pod("web-1", "default", "a1")).unwrap();
        assert_eq!(
            key.fields(),
            &[
                ("obj.metadata.name", "web-1".to_string()),
                ("obj.metadata.namespace", "default".to_string()),
                ("agent_name", "a1".to_string()),
            ]
        );
        assert_eq!(key.to_string(), "obj.metadata.name=web-1,obj.metadata.namespace=default,agent_name=a1");
    }

    #[test]
    fn test_cluster_scoped_key_ignores_namespace() {
        let a = IdentityRule::Name.resolve(&pod("admin", "ns-a", "a1")).unwrap();
        let b = IdentityRule::Name.resolve(&pod("admin", "ns-b", "a1")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_uid_key() {
        let key = IdentityRule::Uid.resolve(&pod("svc", "default", "a1")).unwrap();
        assert_eq!(key.to_filter(), DocumentFilter::new().eq("obj.metadata.uid", "u-1").eq("agent_name", "a1"));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let nameless = MirroredResource::new(json!({"metadata": {"namespace": "default"}}), "a1");
        assert_eq!(
            IdentityRule::NameNamespace.resolve(&nameless),
            Err(IdentityError::MissingField("name"))
        );

        let no_namespace = MirroredResource::new(json!({"metadata": {"name": "x"}}), "a1");
        assert_eq!(
            IdentityRule::NameNamespace.resolve(&no_namespace),
            Err(IdentityError::MissingField("namespace"))
        );

        let ownerless = pod("x", "default", "");
        assert_eq!(IdentityRule::Name.resolve(&ownerless), Err(IdentityError::MissingOwner));
    }

    #[test]
    fn test_query_filters() {
        assert!(owner_filter(None, None).is_empty());
        assert_eq!(
            name_filter("a1", "web-1", Some("default")),
            DocumentFilter::new()
                .eq("obj.metadata.name", "web-1")
                .eq("obj.metadata.namespace", "default")
                .eq("agent_name", "a1")
        );
    }
}
