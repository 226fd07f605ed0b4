// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Indexer Application Service
//!
//! Maintains the denormalized (company, agent) index in the background.
//! The reconciliation engine enqueues a request after writing a
//! company-labelled kind and never waits for the result.
//!
//! - Bounded queue: a full queue drops the request instead of blocking the caller
//! - One worker task, whose `JoinHandle` is returned to the owner for shutdown
//! - Failures are logged and counted, never retried

use crate::domain::agent_index::{AgentIndex, AGENT_INDEX_COLLECTION};
use crate::domain::repository::DocumentStore;
use crate::metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ============================================================================
// Handle
// ============================================================================

/// Producer side of the index queue. Cheap to clone.
///
/// The worker stops once every handle has been dropped.
#[derive(Clone)]
pub struct AgentIndexHandle {
    sender: Option<mpsc::Sender<AgentIndex>>,
}

impl AgentIndexHandle {
    /// Handle that silently discards every request.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues an index refresh for (company, agent) without waiting.
    ///
    /// Returns `true` when the request was queued. Blank values, a disabled
    /// indexer, a full queue or a stopped worker all return `false`.
    pub fn enqueue(&self, company: &str, agent_name: &str) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        let Some(index) = AgentIndex::build(company, agent_name) else {
            return false;
        };

        match sender.try_send(index) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(index)) => {
                metrics::record_index_dropped();
                warn!(
                    company = %index.company,
                    agent = %index.agent_name,
                    "Agent index queue is full, dropping request"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(index)) => {
                metrics::record_index_dropped();
                warn!(
                    company = %index.company,
                    agent = %index.agent_name,
                    "Agent indexer has stopped, dropping request"
                );
                false
            }
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Consumer side of the index queue.
pub struct AgentIndexer {
    store: Arc<dyn DocumentStore>,
    receiver: mpsc::Receiver<AgentIndex>,
}

impl AgentIndexer {
    /// Creates a queue of the given capacity and its worker.
    pub fn channel(store: Arc<dyn DocumentStore>, capacity: usize) -> (AgentIndexHandle, AgentIndexer) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            AgentIndexHandle { sender: Some(sender) },
            AgentIndexer { store, receiver },
        )
    }

    /// Start the background index task
    ///
    /// The task runs until every `AgentIndexHandle` is dropped and the queue
    /// has been drained.
    pub fn start(mut self) -> JoinHandle<()> {
        info!("Starting agent indexer background task");

        tokio::spawn(async move {
            let mut written = 0u64;
            let mut failed = 0u64;

            while let Some(index) = self.receiver.recv().await {
                let document = match serde_json::to_value(&index) {
                    Ok(document) => document,
                    Err(e) => {
                        failed += 1;
                        metrics::record_index_failure();
                        error!(error = %e, "Failed to serialize agent index row");
                        continue;
                    }
                };

                match self
                    .store
                    .upsert_one(AGENT_INDEX_COLLECTION, &index.filter(), document)
                    .await
                {
                    Ok(_) => {
                        written += 1;
                        metrics::record_index_write();
                        debug!(company = %index.company, agent = %index.agent_name, "Agent index updated");
                    }
                    Err(e) => {
                        failed += 1;
                        metrics::record_index_failure();
                        error!(
                            company = %index.company,
                            agent = %index.agent_name,
                            error = %e,
                            "Failed to update agent index"
                        );

                        if failed % 10 == 0 {
                            warn!("Agent index writes have failed {} times", failed);
                        }
                    }
                }
            }

            info!(
                "Agent indexer shut down gracefully ({} rows written, {} errors)",
                written,
                failed
            );
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
