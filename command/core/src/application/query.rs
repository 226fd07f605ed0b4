// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read paths over mirrored objects.

use crate::domain::identity::{name_filter, owner_filter, ResourceScope};
use crate::domain::mirror::MirroredResource;
use crate::domain::registry::{ResourceDescriptor, ResourceRegistry};
use crate::domain::repository::{DocumentStore, RepositoryError};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown object kind: {0}")]
    UnknownKind(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct ResourceQueryService {
    store: Arc<dyn DocumentStore>,
    registry: Arc<ResourceRegistry>,
}

impl ResourceQueryService {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<ResourceRegistry>) -> Self {
        Self { store, registry }
    }

    fn descriptor(&self, kind: &str) -> Result<&ResourceDescriptor, QueryError> {
        self.registry
            .resolve(kind)
            .ok_or_else(|| QueryError::UnknownKind(kind.to_string()))
    }

    /// Mirrored objects of a kind, optionally narrowed to an agent and a
    /// namespace. The namespace is ignored for cluster-scoped kinds.
    pub async fn list(
        &self,
        kind: &str,
        agent: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, QueryError> {
        let descriptor = self.descriptor(kind)?;
        let namespace = scoped_namespace(descriptor, namespace);
        let documents = self
            .store
            .find_many(descriptor.collection, &owner_filter(agent, namespace))
            .await?;

        documents
            .into_iter()
            .map(|document| {
                MirroredResource::from_document(document)
                    .map(|mirror| mirror.obj)
                    .map_err(|e| QueryError::Repository(e.into()))
            })
            .collect()
    }

    /// One mirrored object addressed by agent and name.
    pub async fn get(
        &self,
        kind: &str,
        agent: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, QueryError> {
        let descriptor = self.descriptor(kind)?;
        let namespace = scoped_namespace(descriptor, namespace);
        let document = self
            .store
            .find_one(descriptor.collection, &name_filter(agent, name, namespace))
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("{} {} reported by {}", kind, name, agent)))?;

        Ok(MirroredResource::from_document(document)
            .map_err(RepositoryError::from)?
            .obj)
    }
}

fn scoped_namespace<'a>(descriptor: &ResourceDescriptor, namespace: Option<&'a str>) -> Option<&'a str> {
    match descriptor.scope {
        ResourceScope::Namespaced => namespace.filter(|ns| !ns.is_empty()),
        ResourceScope::Cluster => None,
    }
}
