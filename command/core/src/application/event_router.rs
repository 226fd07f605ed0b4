// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kube Event Router
//!
//! Decodes the inbound change envelope, resolves the kind descriptor and the
//! owning agent, and dispatches ADD/UPDATE/DELETE to the reconciler. Kinds
//! the registry does not know are acknowledged and ignored.

use crate::application::reconciler::{ReconcileError, ResourceReconciler};
use crate::domain::events::{ChangeEvent, Command, UpdateBody, EXTRA_OBJECT};
use crate::domain::registry::ResourceRegistry;
use crate::metrics;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one routed event.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Stored document after an ADD
    Added(Value),
    /// Stored document after an UPDATE
    Updated(Value),
    Deleted { removed: bool },
    Ignored { kind_tag: String },
}

impl RouteOutcome {
    fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Added(_) => "added",
            RouteOutcome::Updated(_) => "updated",
            RouteOutcome::Deleted { removed: true } => "deleted",
            RouteOutcome::Deleted { removed: false } => "absent",
            RouteOutcome::Ignored { .. } => "ignored",
        }
    }
}

pub struct KubeEventRouter {
    registry: Arc<ResourceRegistry>,
    reconciler: Arc<ResourceReconciler>,
}

impl KubeEventRouter {
    pub fn new(registry: Arc<ResourceRegistry>, reconciler: Arc<ResourceReconciler>) -> Self {
        Self { registry, reconciler }
    }

    /// Decodes a raw envelope.
    pub fn decode(payload: &[u8]) -> Result<ChangeEvent, ReconcileError> {
        serde_json::from_slice(payload).map_err(|e| ReconcileError::Decode(e.to_string()))
    }

    /// Applies one event to the store.
    pub async fn route(&self, event: ChangeEvent) -> Result<RouteOutcome, ReconcileError> {
        let command = event.command();
        let kind = self.kind_label(&event);

        let result = self.dispatch(event).await;
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(ReconcileError::Repository(_)) => "store_error",
            Err(_) => "rejected",
        };
        metrics::record_event(command.as_str(), kind, outcome);
        result
    }

    /// Metric label for the event's kind: the registry tag, or
    /// [`metrics::UNKNOWN_KIND`] for tags the registry does not resolve.
    pub fn kind_label(&self, event: &ChangeEvent) -> &'static str {
        event
            .kind_tag()
            .and_then(|tag| self.registry.resolve(tag))
            .map(|descriptor| descriptor.tag)
            .unwrap_or(metrics::UNKNOWN_KIND)
    }

    async fn dispatch(&self, event: ChangeEvent) -> Result<RouteOutcome, ReconcileError> {
        let command = event.command();
        let kind_tag = event
            .kind_tag()
            .ok_or_else(|| ReconcileError::Decode(format!("header.extras.{} is missing", EXTRA_OBJECT)))?;

        let Some(descriptor) = self.registry.resolve(kind_tag) else {
            warn!(command = %command, kind = kind_tag, "Unknown object kind, ignoring event");
            return Ok(RouteOutcome::Ignored { kind_tag: kind_tag.to_string() });
        };
        let owner = event.owner().ok_or(ReconcileError::MissingOwner)?.to_string();
        debug!(command = %command, kind = descriptor.tag, agent = %owner, "Routing kube event");

        match command {
            Command::Add => {
                let obj = require_object(event.body, "body")?;
                let stored = self.reconciler.add(descriptor, obj, &owner).await?;
                Ok(RouteOutcome::Added(stored))
            }
            Command::Update => {
                let body: UpdateBody = serde_json::from_value(event.body)
                    .map_err(|e| ReconcileError::Decode(format!("invalid UPDATE body: {}", e)))?;
                let body = UpdateBody {
                    old_k8s_obj: require_object(body.old_k8s_obj, "old_k8s_obj")?,
                    new_k8s_obj: require_object(body.new_k8s_obj, "new_k8s_obj")?,
                };
                let stored = self.reconciler.update(descriptor, body, &owner).await?;
                Ok(RouteOutcome::Updated(stored))
            }
            Command::Delete => {
                let obj = require_object(event.body, "body")?;
                let removed = self.reconciler.delete(descriptor, obj, &owner).await?;
                Ok(RouteOutcome::Deleted { removed })
            }
        }
    }
}

fn require_object(value: Value, field: &str) -> Result<Value, ReconcileError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ReconcileError::Decode(format!("{} must be a JSON object", field)))
    }
}
