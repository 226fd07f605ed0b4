// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Registry
//!
//! Data-driven table of every mirrored resource kind. A row carries the
//! collection name, the schema tag stamped on incoming objects, the identity
//! rule and whether writes feed the agent index. Supporting a new kind is a
//! new row; the router and the reconciliation engine never branch on kind.
//!
//! | Tag | Kind | Identity |
//! |-----|------|----------|
//! | `clusterRole`, `clusterRoleBinding`, `namespace`, `node`, `persistentVolume` | cluster-scoped | name + agent |
//! | `certificate` | namespaced | name + agent |
//! | `service` | namespaced | uid + agent |
//! | everything else | namespaced | name + namespace + agent |

use serde_json::Value;

use crate::domain::identity::{IdentityError, IdentityKey, IdentityRule, ResourceScope};
use crate::domain::mirror::{MirroredResource, SchemaTag};
use crate::domain::identity::IdentityRule::{Name, NameNamespace, Uid};
use crate::domain::identity::ResourceScope::{Cluster, Namespaced};

/// One row of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Tag agents send in `extras.object`
    pub tag: &'static str,
    pub collection: &'static str,
    pub schema: SchemaTag,
    pub identity: IdentityRule,
    pub scope: ResourceScope,
    /// Writes of this kind refresh the (company, agent) index
    pub indexes_company: bool,
}

impl ResourceDescriptor {
    /// Builds a mirror of this kind, stamped with its schema tag.
    pub fn mirror(&self, obj: Value, owner: &str) -> MirroredResource {
        let mut mirror = MirroredResource::new(obj, owner);
        mirror.stamp(self.schema);
        mirror
    }

    pub fn identity_of(&self, mirror: &MirroredResource) -> Result<IdentityKey, IdentityError> {
        self.identity.resolve(mirror)
    }
}

const fn row(
    tag: &'static str,
    collection: &'static str,
    kind: &'static str,
    api_version: &'static str,
    identity: IdentityRule,
    scope: ResourceScope,
    indexes_company: bool,
) -> ResourceDescriptor {
    ResourceDescriptor {
        tag,
        collection,
        schema: SchemaTag { kind, api_version },
        identity,
        scope,
        indexes_company,
    }
}

const RBAC_V1: &str = "rbac.authorization.k8s.io/v1";

/// Built-in kinds reported by the lighthouse agents.
pub static BUILTIN_DESCRIPTORS: &[ResourceDescriptor] = &[
    row("certificate", "certificateCollection", "Certificate", "cert-manager.io/v1", Name, Namespaced, false),
    row("clusterRole", "clusterRoleCollection", "ClusterRole", RBAC_V1, Name, Cluster, true),
    row("clusterRoleBinding", "clusterRoleBindingCollection", "ClusterRoleBinding", RBAC_V1, Name, Cluster, false),
    row("configMap", "configMapCollection", "ConfigMap", "v1", NameNamespace, Namespaced, false),
    row("daemonset", "daemonSetCollection", "DaemonSet", "apps/v1", NameNamespace, Namespaced, false),
    row("deployment", "deploymentCollection", "Deployment", "apps/v1", NameNamespace, Namespaced, true),
    row("event", "eventCollection", "Event", "v1", NameNamespace, Namespaced, false),
    row("ingress", "ingressCollection", "Ingress", "extensions/v1beta1", NameNamespace, Namespaced, false),
    row("namespace", "namespaceCollection", "Namespace", "v1", Name, Cluster, false),
    row("networkPolicy", "networkPolicyCollection", "NetworkPolicy", "networking.k8s.io/v1", NameNamespace, Namespaced, false),
    row("node", "nodeCollection", "Node", "v1", Name, Cluster, false),
    row("persistentVolume", "persistentVolumeCollection", "PersistentVolume", "v1", Name, Cluster, false),
    row("persistentVolumeClaim", "persistentVolumeClaimCollection", "PersistentVolumeClaim", "v1", NameNamespace, Namespaced, false),
    row("pod", "podCollection", "Pod", "v1", NameNamespace, Namespaced, false),
    row("replicaset", "replicaSetCollection", "ReplicaSet", "apps/v1", NameNamespace, Namespaced, false),
    row("role", "roleCollection", "Role", RBAC_V1, NameNamespace, Namespaced, false),
    row("roleBinding", "roleBindingCollection", "RoleBinding", RBAC_V1, NameNamespace, Namespaced, false),
    row("secret", "secretCollection", "Secret", "v1", NameNamespace, Namespaced, false),
    row("service", "serviceCollection", "Service", "v1", Uid, Namespaced, false),
    row("serviceAccount", "serviceAccountCollection", "ServiceAccount", "v1", NameNamespace, Namespaced, true),
    row("statefulset", "statefulSetCollection", "StatefulSet", "apps/v1", NameNamespace, Namespaced, true),
];

/// Lookup of descriptors by kind tag.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    descriptors: Vec<ResourceDescriptor>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResourceRegistry {
    pub fn builtin() -> Self {
        Self::with_descriptors(BUILTIN_DESCRIPTORS.to_vec())
    }

    pub fn with_descriptors(descriptors: Vec<ResourceDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Descriptor for a kind tag, `None` for kinds the registry does not know.
    pub fn resolve(&self, tag: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.tag == tag)
    }

    /// Zero-value mirror for a kind tag, stamped with the kind's schema tag.
    pub fn mirror(&self, tag: &str, obj: Value, owner: &str) -> Option<MirroredResource> {
        self.resolve(tag).map(|descriptor| descriptor.mirror(obj, owner))
    }

    pub fn descriptors(&self) -> &[ResourceDescriptor] {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_table_is_consistent() {
        let registry = ResourceRegistry::builtin();
        assert_eq!(registry.descriptors().len(), 21);

        let tags: HashSet<_> = registry.descriptors().iter().map(|d| d.tag).collect();
        let collections: HashSet<_> = registry.descriptors().iter().map(|d| d.collection).collect();
        assert_eq!(tags.len(), 21, "tags must be unique");
        assert_eq!(collections.len(), 21, "collections must be unique");

        for descriptor in registry.descriptors() {
            if descriptor.scope == ResourceScope::Cluster {
                assert_eq!(descriptor.identity, IdentityRule::Name, "{}", descriptor.tag);
            }
        }
    }

    #[test]
    fn test_certificates_are_namespaced() {
        let registry = ResourceRegistry::builtin();
        let certificate = registry.resolve("certificate").unwrap();
        assert_eq!(certificate.scope, ResourceScope::Namespaced);
        assert_eq!(certificate.identity, IdentityRule::Name);
    }

    #[test]
    fn test_company_indexed_kinds() {
        let registry = ResourceRegistry::builtin();
        let mut indexed: Vec<_> = registry
            .descriptors()
            .iter()
            .filter(|d| d.indexes_company)
            .map(|d| d.schema.kind)
            .collect();
        indexed.sort();
        assert_eq!(indexed, vec!["ClusterRole", "Deployment", "ServiceAccount", "StatefulSet"]);
    }

    #[test]
    fn test_mirror_is_stamped() {
        let registry = ResourceRegistry::builtin();
        let mirror = registry
            .mirror("deployment", json!({"metadata": {"name": "api"}}), "a1")
            .unwrap();
        assert_eq!(mirror.obj["kind"], "Deployment");
        assert_eq!(mirror.obj["apiVersion"], "apps/v1");
        assert_eq!(mirror.agent_name, "a1");
    }

    #[test]
    fn test_unknown_tag_resolves_to_none() {
        let registry = ResourceRegistry::builtin();
        assert!(registry.resolve("cronJob").is_none());
        assert!(registry.mirror("Deployment", json!({}), "a1").is_none(), "tags are case sensitive");
    }

    #[test]
    fn test_service_identity_uses_uid() {
        let registry = ResourceRegistry::builtin();
        let service = registry.resolve("service").unwrap();
        let mirror = service.mirror(json!({"metadata": {"name": "api", "namespace": "default", "uid": "u-9"}}), "a1");
        let key = service.identity_of(&mirror).unwrap();
        assert_eq!(key.fields()[0], ("obj.metadata.uid", "u-9".to_string()));
    }
}
