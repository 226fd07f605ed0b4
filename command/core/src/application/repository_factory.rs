// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete document store based on storage backend configuration,
//! keeping the Domain Layer free of infrastructure dependencies.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Selects the `DocumentStore` implementation at startup

use std::sync::Arc;
use sqlx::PgPool;

use crate::domain::repository::{DocumentStore, StorageBackend};
use crate::infrastructure::repositories::InMemoryDocumentStore;
use crate::infrastructure::repositories::postgres_document::PostgresDocumentStore;

/// Creates a DocumentStore implementation based on the configured backend
///
/// The PostgreSQL backend needs an open pool; the in-memory backend ignores it.
pub fn create_document_store(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match (backend, pool) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryDocumentStore::new())),
        (StorageBackend::PostgreSQL(_), Some(pool)) => Ok(Arc::new(PostgresDocumentStore::new(pool))),
        (StorageBackend::PostgreSQL(_), None) => {
            anyhow::bail!("PostgreSQL backend selected but no connection pool was provided")
        }
    }
}
