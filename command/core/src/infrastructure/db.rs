// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that can be
//! injected into the PostgreSQL document store.
//!
//! Only required when `spec.database.backend` is `postgres`; the in-memory
//! backend never opens a pool.

use sqlx::postgres::{PgPool, PgPoolOptions};
use anyhow::Result;
use tracing::info;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS kube_documents (
        id UUID PRIMARY KEY,
        collection TEXT NOT NULL,
        document JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS kube_documents_collection_idx ON kube_documents (collection, created_at)",
    "CREATE INDEX IF NOT EXISTS kube_documents_document_idx ON kube_documents USING GIN (document jsonb_path_ops)",
];

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    /// Creates the document table and its indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Document store schema is up to date");
        Ok(())
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
