// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent Index
//!
//! Denormalized record of which agents report for which company. Not
//! authoritative: rows are upserted opportunistically after writes to
//! company-labelled kinds and never read back by the reconciliation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::DocumentFilter;

pub const AGENT_INDEX_COLLECTION: &str = "agentIndexCollection";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIndex {
    pub company: String,
    pub agent_name: String,
    pub last_seen_at: DateTime<Utc>,
}

impl AgentIndex {
    /// Returns `None` when either side of the pair is blank.
    pub fn build(company: &str, agent_name: &str) -> Option<Self> {
        if company.trim().is_empty() || agent_name.trim().is_empty() {
            return None;
        }
        Some(Self {
            company: company.to_string(),
            agent_name: agent_name.to_string(),
            last_seen_at: Utc::now(),
        })
    }

    /// Filter selecting this (company, agent) row.
    pub fn filter(&self) -> DocumentFilter {
        DocumentFilter::new()
            .eq("agent_name", self.agent_name.clone())
            .eq("company", self.company.clone())
    }
}
