// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reconciliation metrics.
//!
//! Counters for processed change events and for the agent indexer. Recording
//! goes through the `metrics` facade and is a no-op until a recorder (the
//! Prometheus exporter installed by the CLI) is present.

use metrics::{counter, describe_counter};

// ============================================================================
// Event Metrics
// ============================================================================

/// Change events handled, labelled by command, kind and outcome.
pub const KUBE_EVENTS: &str = "lighthouse_kube_events_total";

/// `kind` label for events whose tag the registry does not resolve.
pub const UNKNOWN_KIND: &str = "unknown";

// ============================================================================
// Agent Index Metrics
// ============================================================================

/// Index requests dropped because the queue was full.
pub const AGENT_INDEX_DROPPED: &str = "lighthouse_agent_index_dropped_total";

/// Index rows written.
pub const AGENT_INDEX_WRITES: &str = "lighthouse_agent_index_writes_total";

/// Index writes that failed.
pub const AGENT_INDEX_FAILURES: &str = "lighthouse_agent_index_failures_total";

// ============================================================================
// Metric Registration
// ============================================================================

/// Registers all metric descriptions.
///
/// Call this once at application startup after installing the recorder.
pub fn register_metrics() {
    describe_counter!(KUBE_EVENTS, "Total kube change events processed");
    describe_counter!(AGENT_INDEX_DROPPED, "Total agent index requests dropped on a full queue");
    describe_counter!(AGENT_INDEX_WRITES, "Total agent index rows upserted");
    describe_counter!(AGENT_INDEX_FAILURES, "Total agent index writes that failed");
}

// ============================================================================
// Recording
// ============================================================================

/// Records one processed change event.
///
/// `kind` must come from the registry or be [`UNKNOWN_KIND`] so the label
/// set stays bounded.
pub fn record_event(command: &'static str, kind: &'static str, outcome: &'static str) {
    counter!(
        KUBE_EVENTS,
        "command" => command,
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_index_dropped() {
    counter!(AGENT_INDEX_DROPPED).increment(1);
}

pub fn record_index_write() {
    counter!(AGENT_INDEX_WRITES).increment(1);
}

pub fn record_index_failure() {
    counter!(AGENT_INDEX_FAILURES).increment(1);
}
