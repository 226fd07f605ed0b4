// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource Reconciler Application Service
//!
//! The generic, idempotent write algorithm applied to every mirrored kind:
//! compute the identity key from the descriptor, check the store, then
//! insert, replace or delete exactly one document.
//!
//! There is no locking and no transaction spanning the check and the write;
//! two concurrent events for the same object race and the last write wins.

use crate::domain::config::UpdateKeySource;
use crate::domain::events::UpdateBody;
use crate::domain::identity::{owner_filter, IdentityError, IdentityKey};
use crate::domain::mirror::MirroredResource;
use crate::domain::registry::ResourceDescriptor;
use crate::domain::repository::{DocumentStore, RepositoryError};
use crate::application::agent_indexer::AgentIndexHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to decode event: {0}")]
    Decode(String),

    #[error("Event does not name an owning agent")]
    MissingOwner,

    #[error("Cannot compute identity key: {0}")]
    MissingIdentity(IdentityError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<IdentityError> for ReconcileError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingOwner => ReconcileError::MissingOwner,
            other => ReconcileError::MissingIdentity(other),
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Repository(err.into())
    }
}

/// Counts reported by a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSummary {
    pub removed: u64,
    pub inserted: u64,
}

pub struct ResourceReconciler {
    store: Arc<dyn DocumentStore>,
    indexer: AgentIndexHandle,
    update_key_source: UpdateKeySource,
}

impl ResourceReconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        indexer: AgentIndexHandle,
        update_key_source: UpdateKeySource,
    ) -> Self {
        Self {
            store,
            indexer,
            update_key_source,
        }
    }

    pub fn update_key_source(&self) -> UpdateKeySource {
        self.update_key_source
    }

    /// Inserts the object, or replaces the stored copy when one already
    /// exists under the same identity. Returns the stored document.
    pub async fn add(
        &self,
        descriptor: &ResourceDescriptor,
        obj: Value,
        owner: &str,
    ) -> Result<Value, ReconcileError> {
        let mirror = descriptor.mirror(obj, owner);
        let key = descriptor.identity_of(&mirror)?;
        let filter = key.to_filter();
        let document = mirror.to_document()?;

        let stored = match self.store.find_one(descriptor.collection, &filter).await? {
            None => {
                self.store.insert_one(descriptor.collection, document.clone()).await?;
                debug!(kind = descriptor.tag, key = %key, "Inserted mirrored object");
                document
            }
            Some(_) => {
                debug!(kind = descriptor.tag, key = %key, "Object already mirrored, replacing");
                self.store.upsert_one(descriptor.collection, &filter, document).await?
            }
        };

        self.refresh_index(descriptor, &mirror);
        Ok(stored)
    }

    /// Replaces the stored copy of an object with its new state, inserting
    /// the full new object when nothing is stored yet.
    pub async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        body: UpdateBody,
        owner: &str,
    ) -> Result<Value, ReconcileError> {
        let old = descriptor.mirror(body.old_k8s_obj, owner);
        let new = descriptor.mirror(body.new_k8s_obj, owner);
        let new_key = descriptor.identity_of(&new)?;
        let retired_key = match self.update_key_source {
            UpdateKeySource::Old => renamed_from(descriptor, &old, &new_key),
            UpdateKeySource::New => None,
        };

        // New copy first: a failure before the old key is retired leaves a
        // duplicate, never a gap.
        let stored = self
            .store
            .upsert_one(descriptor.collection, &new_key.to_filter(), new.to_document()?)
            .await?;
        debug!(kind = descriptor.tag, key = %new_key, "Updated mirrored object");

        if let Some(old_key) = retired_key {
            self.retire_old_key(descriptor, &old_key, &new_key).await?;
        }

        self.refresh_index(descriptor, &new);
        Ok(stored)
    }

    /// Removes the document left under the old key of a renamed object.
    async fn retire_old_key(
        &self,
        descriptor: &ResourceDescriptor,
        old_key: &IdentityKey,
        new_key: &IdentityKey,
    ) -> Result<(), ReconcileError> {
        let removed = self
            .store
            .delete_one(descriptor.collection, &old_key.to_filter())
            .await?;
        if removed > 0 {
            info!(
                kind = descriptor.tag,
                from = %old_key,
                to = %new_key,
                "Object renamed, moved mirrored document"
            );
        }
        Ok(())
    }

    /// Deletes the stored copy of an object. Returns whether a document was removed.
    pub async fn delete(
        &self,
        descriptor: &ResourceDescriptor,
        obj: Value,
        owner: &str,
    ) -> Result<bool, ReconcileError> {
        let mirror = descriptor.mirror(obj, owner);
        let key = descriptor.identity_of(&mirror)?;

        let removed = self
            .store
            .delete_one(descriptor.collection, &key.to_filter())
            .await?;
        if removed == 0 {
            info!(kind = descriptor.tag, key = %key, "Nothing to delete, object is not mirrored");
        }
        Ok(removed > 0)
    }

    /// Replaces every document the owner has for a kind with a snapshot.
    ///
    /// The whole snapshot is validated before the store is touched. When two
    /// objects share an identity the later one wins.
    pub async fn resync(
        &self,
        descriptor: &ResourceDescriptor,
        owner: &str,
        objects: Vec<Value>,
    ) -> Result<ResyncSummary, ReconcileError> {
        if owner.trim().is_empty() {
            return Err(ReconcileError::MissingOwner);
        }

        let mut mirrors: Vec<MirroredResource> = Vec::with_capacity(objects.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for obj in objects {
            if !obj.is_object() {
                return Err(ReconcileError::Decode(format!(
                    "{} snapshot entries must be JSON objects",
                    descriptor.tag
                )));
            }
            let mirror = descriptor.mirror(obj, owner);
            let key = descriptor.identity_of(&mirror)?.to_string();
            match positions.get(&key) {
                Some(&position) => mirrors[position] = mirror,
                None => {
                    positions.insert(key, mirrors.len());
                    mirrors.push(mirror);
                }
            }
        }

        let documents = mirrors
            .iter()
            .map(MirroredResource::to_document)
            .collect::<Result<Vec<_>, _>>()?;

        let removed = self
            .store
            .delete_many(descriptor.collection, &owner_filter(Some(owner), None))
            .await?;
        let inserted = self.store.insert_many(descriptor.collection, documents).await?;

        for mirror in &mirrors {
            self.refresh_index(descriptor, mirror);
        }

        info!(kind = descriptor.tag, agent = owner, removed, inserted, "Resynced mirrored objects");
        Ok(ResyncSummary { removed, inserted })
    }

    /// Deletes every document the owner has for a kind.
    pub async fn purge(&self, descriptor: &ResourceDescriptor, owner: &str) -> Result<u64, ReconcileError> {
        if owner.trim().is_empty() {
            return Err(ReconcileError::MissingOwner);
        }

        let removed = self
            .store
            .delete_many(descriptor.collection, &owner_filter(Some(owner), None))
            .await?;
        info!(kind = descriptor.tag, agent = owner, removed, "Purged mirrored objects");
        Ok(removed)
    }

    fn refresh_index(&self, descriptor: &ResourceDescriptor, mirror: &MirroredResource) {
        if !descriptor.indexes_company {
            return;
        }
        if let Some(company) = mirror.company() {
            self.indexer.enqueue(company, &mirror.agent_name);
        }
    }
}

/// Old identity key of an object whose key changed in this update. `None`
/// when the key is unchanged or the old object has no usable key.
fn renamed_from(
    descriptor: &ResourceDescriptor,
    old: &MirroredResource,
    new_key: &IdentityKey,
) -> Option<IdentityKey> {
    match descriptor.identity_of(old) {
        Ok(old_key) if &old_key != new_key => Some(old_key),
        Ok(_) => None,
        Err(e) => {
            debug!(kind = descriptor.tag, error = %e, "Old object has no identity, resolving by new key");
            None
        }
    }
}
