//! The state repository
//!
//! [`StateRepository`] is the single owner of stored state. It combines a
//! [`DocumentIndex`] backend, a [`LockTable`] and a [`ResolutionPolicy`],
//! and is shared by `Arc` handle with every request handler.
//!
//! ## Concurrency
//!
//! | Operation | Lock on key | Steps under the lock |
//! |-----------|-------------|----------------------|
//! | `upsert` | write | put |
//! | `fetch` / `fetch_record` | read | list, resolve, get |
//! | `erase` | write | list, resolve, remove |
//! | `versions` | read | list |
//!
//! Readers never see a half-applied write, and two erases on one key always
//! remove two different versions. Keys on different stripes never wait on
//! each other.

mod builder;

pub use builder::{RepositoryBuilder, StorageBackend};

use std::sync::Arc;

use grantstate_concurrency::LockTable;
use grantstate_core::{
    BusinessKey, Document, PutOutcome, StateError, StateRecord, StateResult, VersionTag,
};
use grantstate_storage::{DocumentIndex, IndexStats};
use tracing::{debug, info};

use crate::resolver::ResolutionPolicy;

/// Versioned document store keyed by business key
pub struct StateRepository {
    index: Arc<dyn DocumentIndex>,
    locks: LockTable,
    policy: ResolutionPolicy,
}

impl std::fmt::Debug for StateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRepository")
            .field("backend", &self.index.backend_name())
            .field("stripes", &self.locks.stripes())
            .field("policy", &self.policy)
            .finish()
    }
}

impl StateRepository {
    /// Build a repository over an existing backend
    pub fn new(index: Arc<dyn DocumentIndex>, locks: LockTable, policy: ResolutionPolicy) -> Self {
        info!(
            target: "grantstate::repo",
            backend = index.backend_name(),
            stripes = locks.stripes(),
            policy = %policy,
            "State repository ready"
        );
        Self {
            index,
            locks,
            policy,
        }
    }

    /// Builder for a repository with its own backend
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::new()
    }

    /// In-memory repository with default locks and policy
    pub fn ephemeral() -> Self {
        RepositoryBuilder::new().build_ephemeral()
    }

    /// Active resolution policy
    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Backend counters
    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Backend name, `"memory"` or `"log"`
    pub fn backend_name(&self) -> &'static str {
        self.index.backend_name()
    }

    /// Insert or replace the record for (key, tag)
    ///
    /// `created` in the outcome is true iff the pair was new.
    pub fn upsert(
        &self,
        key: &BusinessKey,
        tag: &VersionTag,
        payload: Document,
    ) -> StateResult<PutOutcome> {
        let _guard = self.locks.write(key);
        let outcome = self.index.put(key, tag, payload)?;
        debug!(
            target: "grantstate::repo",
            key = %key,
            tag = %tag,
            created = outcome.created,
            "Upserted state"
        );
        Ok(outcome)
    }

    /// Payload of the effective version of `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if no version is stored.
    pub fn fetch(&self, key: &BusinessKey) -> StateResult<Document> {
        self.fetch_record(key).map(|record| record.payload)
    }

    /// Full record of the effective version of `key`
    pub fn fetch_record(&self, key: &BusinessKey) -> StateResult<StateRecord> {
        let _guard = self.locks.read(key);
        let tag = self.effective_tag(key)?;
        match self.index.get(key, &tag)? {
            Some(record) => Ok(record),
            // Listing and getting happen under one read lock, so the tag
            // cannot vanish in between.
            None => Err(StateError::internal(format!(
                "listed version '{}' of {} is missing",
                tag, key
            ))),
        }
    }

    /// Remove the effective version of `key`, returning its tag
    ///
    /// The next most recent version, if any, becomes effective.
    ///
    /// # Errors
    ///
    /// `NotFound` if no version is stored.
    pub fn erase(&self, key: &BusinessKey) -> StateResult<VersionTag> {
        let _guard = self.locks.write(key);
        let tag = self.effective_tag(key)?;
        if !self.index.remove(key, &tag)? {
            return Err(StateError::internal(format!(
                "effective version '{}' of {} disappeared under write lock",
                tag, key
            )));
        }
        debug!(target: "grantstate::repo", key = %key, tag = %tag, "Erased effective state");
        Ok(tag)
    }

    /// Stored tags of `key`, oldest creation first
    pub fn versions(&self, key: &BusinessKey) -> StateResult<Vec<VersionTag>> {
        let _guard = self.locks.read(key);
        self.index.list_versions(key)
    }

    /// Caller must hold a lock on `key`
    fn effective_tag(&self, key: &BusinessKey) -> StateResult<VersionTag> {
        let tags = self.index.list_versions(key)?;
        self.policy
            .resolve(&tags)
            .cloned()
            .ok_or_else(|| StateError::not_found(key))
    }
}
