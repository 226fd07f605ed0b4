// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Document Store
//!
//! Stores every mirrored document as one JSONB row tagged with its
//! collection. Equality filters become containment (`@>`) predicates, which
//! the GIN index created by the migration serves directly.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `DocumentStore` over PostgreSQL

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::domain::repository::{DocumentFilter, DocumentStore, RepositoryError};

pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn document_from_row(row: &sqlx::postgres::PgRow) -> Result<Value, RepositoryError> {
    row.try_get::<Value, _>("document")
        .map_err(|e| RepositoryError::Database(format!("Missing document column: {}", e)))
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find_one(&self, collection: &str, filter: &DocumentFilter) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT document
            FROM kube_documents
            WHERE collection = $1 AND document @> $2
            ORDER BY created_at ASC
            LIMIT 1
            "#
        )
        .bind(collection)
        .bind(filter.to_containment())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn find_many(&self, collection: &str, filter: &DocumentFilter) -> Result<Vec<Value>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT document
            FROM kube_documents
            WHERE collection = $1 AND document @> $2
            ORDER BY created_at ASC
            "#
        )
        .bind(collection)
        .bind(filter.to_containment())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(document_from_row).collect()
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO kube_documents (id, collection, document, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            "#
        )
        .bind(Uuid::new_v4())
        .bind(collection)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert document: {}", e)))?;

        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<u64, RepositoryError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for document in documents {
            let result = sqlx::query(
                r#"
                INSERT INTO kube_documents (id, collection, document, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                "#
            )
            .bind(Uuid::new_v4())
            .bind(collection)
            .bind(document)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to insert document: {}", e)))?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        replacement: Value,
    ) -> Result<Value, RepositoryError> {
        // Not atomic: a concurrent writer can slip in between the update and
        // the fallback insert, matching the find-and-modify semantics agents expect.
        let updated = sqlx::query(
            r#"
            UPDATE kube_documents
            SET document = $3, updated_at = NOW()
            WHERE id = (
                SELECT id FROM kube_documents
                WHERE collection = $1 AND document @> $2
                ORDER BY created_at ASC
                LIMIT 1
            )
            RETURNING document
            "#
        )
        .bind(collection)
        .bind(filter.to_containment())
        .bind(&replacement)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update document: {}", e)))?;

        if let Some(row) = updated {
            return document_from_row(&row);
        }

        debug!(collection, "No document matched upsert filter, inserting");
        self.insert_one(collection, replacement.clone()).await?;
        Ok(replacement)
    }

    async fn delete_one(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM kube_documents
            WHERE id = (
                SELECT id FROM kube_documents
                WHERE collection = $1 AND document @> $2
                ORDER BY created_at ASC
                LIMIT 1
            )
            "#
        )
        .bind(collection)
        .bind(filter.to_containment())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &DocumentFilter) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM kube_documents
            WHERE collection = $1 AND document @> $2
            "#
        )
        .bind(collection)
        .bind(filter.to_containment())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
