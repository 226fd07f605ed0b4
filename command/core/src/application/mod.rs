// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent_indexer;
pub mod event_router;
pub mod query;
pub mod reconciler;
pub mod repository_factory;

// Re-export services for convenience
pub use agent_indexer::{AgentIndexHandle, AgentIndexer};
pub use event_router::{KubeEventRouter, RouteOutcome};
pub use query::{QueryError, ResourceQueryService};
pub use reconciler::{ReconcileError, ResourceReconciler, ResyncSummary};
