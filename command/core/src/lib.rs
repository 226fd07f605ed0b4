// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Reconciliation engine that mirrors Kubernetes objects reported by
//! lighthouse agents into a document store, partitioned per agent.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, reconciliation services, stores and HTTP API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod metrics;

pub use domain::*;
