// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for mirrored resources. Every resource kind lives in
//! its own named collection of JSON documents; the engine never issues
//! anything richer than a conjunction of dotted-path equality clauses.
//!
//! | Trait | Stored shape | Implementations |
//! |-------|--------------|-----------------|
//! | `DocumentStore` | `{ "obj": <k8s object>, "agent_name": <owner> }` | `InMemoryDocumentStore`, `PostgresDocumentStore` |
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at startup from
//! `spec.database.backend` in `lighthouse-config.yaml`. The in-memory store is
//! used for development and testing, PostgreSQL (JSONB) for production.

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Conjunction of equality clauses over dotted document paths
/// (e.g. `obj.metadata.name == "web-1" AND agent_name == "a1"`).
///
/// An empty filter matches every document of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    clauses: Vec<(String, Value)>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause. A later clause on the same path replaces the earlier one.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        let path = path.into();
        let value = value.into();
        match self.clauses.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => existing.1 = value,
            None => self.clauses.push((path, value)),
        }
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, document: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(path, expected)| lookup_path(document, path) == Some(expected))
    }

    /// Nested JSON object equivalent to the filter, suitable for a JSONB
    /// containment (`@>`) query.
    pub fn to_containment(&self) -> Value {
        let mut root = Map::new();
        for (path, value) in &self.clauses {
            let segments: Vec<&str> = path.split('.').collect();
            insert_path(&mut root, &segments, value.clone());
        }
        Value::Object(root)
    }
}

fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            map.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(child) => insert_path(child, rest, value),
                other => {
                    let mut child = Map::new();
                    insert_path(&mut child, rest, value);
                    *other = Value::Object(child);
                }
            }
        }
    }
}

/// Resolves a dotted path (`obj.metadata.name`) inside a JSON document.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Document collection contract used by the reconciliation engine.
///
/// The store has no notion of identity: callers build the filters. No
/// operation spans more than one document atomically, except the
/// `*_many` helpers which are not atomic either.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find the first document matching the filter
    async fn find_one(&self, collection: &str, filter: &DocumentFilter) -> Result<Option<Value>, RepositoryError>;

    /// Find every document matching the filter
    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, RepositoryError>;

    /// Insert a single document
    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), RepositoryError>;

    /// Insert several documents, returning how many were written
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<u64, RepositoryError>;

    /// Replace the first document matching the filter, inserting the
    /// replacement when nothing matches. Returns the stored document.
    async fn upsert_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        replacement: Value,
    ) -> Result<Value, RepositoryError>;

    /// Delete the first matching document, returning how many were removed (0 or 1)
    async fn delete_one(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError>;

    /// Delete every matching document, returning how many were removed
    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
