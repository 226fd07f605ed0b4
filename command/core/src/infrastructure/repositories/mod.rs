// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! This module provides infrastructure implementations of the document store
//! abstraction defined in the domain layer, following the Repository pattern
//! from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve mirrored resource documents
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//!
//! - **PostgresDocumentStore** - one JSONB row per document, filters evaluated
//!   with the `@>` containment operator
//!
//! ## In-Memory
//!
//! - **InMemoryDocumentStore** - thread-safe map of collections, used for
//!   development and tests
//!
//! # Usage
//!
//! ```ignore
//! use sqlx::PgPool;
//! use repositories::postgres_document::PostgresDocumentStore;
//!
//! let pool = PgPool::connect(&database_url).await?;
//! let store = PostgresDocumentStore::new(pool);
//! let pods = store.find_many("podCollection", &filter).await?;
//! ```

pub mod postgres_document;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::repository::{DocumentFilter, DocumentStore, RepositoryError};

/// Document store backed by in-process vectors, one per collection.
///
/// Insertion order is preserved, so "first matching document" is the oldest one.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).map(Vec::len).unwrap_or(0)
    }

    /// Total number of documents across every collection.
    pub fn total(&self) -> usize {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        collections.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: &DocumentFilter) -> Result<Option<Value>, RepositoryError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, RepositoryError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), RepositoryError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.entry(collection.to_string()).or_default().push(document);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<u64, RepositoryError> {
        let count = documents.len() as u64;
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.entry(collection.to_string()).or_default().extend(documents);
        Ok(count)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        replacement: Value,
    ) -> Result<Value, RepositoryError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|doc| filter.matches(doc)) {
            Some(existing) => *existing = replacement.clone(),
            None => docs.push(replacement.clone()),
        }
        Ok(replacement)
    }

    async fn delete_one(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(name: &str, agent: &str) -> Value {
        json!({"obj": {"metadata": {"name": name, "namespace": "default"}}, "agent_name": agent})
    }

    fn by_name(name: &str) -> DocumentFilter {
        DocumentFilter::new().eq("obj.metadata.name", name)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryDocumentStore::new();
        store.insert_one("pods", pod("web-1", "a1")).await.unwrap();
        store.insert_one("pods", pod("web-2", "a1")).await.unwrap();

        let found = store.find_one("pods", &by_name("web-2")).await.unwrap();
        assert_eq!(found, Some(pod("web-2", "a1")));

        let all = store.find_many("pods", &DocumentFilter::new()).await.unwrap();
        assert_eq!(all.len(), 2);

        assert!(store.find_one("other", &DocumentFilter::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_or_inserts() {
        let store = InMemoryDocumentStore::new();
        store.upsert_one("pods", &by_name("web-1"), pod("web-1", "a1")).await.unwrap();
        assert_eq!(store.count("pods"), 1);

        let replacement = json!({"obj": {"metadata": {"name": "web-1"}, "status": "Running"}, "agent_name": "a1"});
        let stored = store.upsert_one("pods", &by_name("web-1"), replacement.clone()).await.unwrap();
        assert_eq!(stored, replacement);
        assert_eq!(store.count("pods"), 1);
        assert_eq!(store.find_one("pods", &by_name("web-1")).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_many("pods", vec![pod("web-1", "a1"), pod("web-2", "a1"), pod("web-3", "a2")])
            .await
            .unwrap();

        assert_eq!(store.delete_one("pods", &by_name("missing")).await.unwrap(), 0);
        assert_eq!(store.delete_one("pods", &by_name("web-1")).await.unwrap(), 1);

        let agent_a1 = DocumentFilter::new().eq("agent_name", "a1");
        assert_eq!(store.delete_many("pods", &agent_a1).await.unwrap(), 1);
        assert_eq!(store.count("pods"), 1);
        assert_eq!(store.delete_many("unknown", &agent_a1).await.unwrap(), 0);
    }
}
