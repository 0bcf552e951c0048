//! The Document Index contract
//!
//! A [`DocumentIndex`] maps a [`BusinessKey`] to the set of versions stored
//! under it. It is a pure data structure: it does not resolve which version
//! is effective and does not coordinate multi-step operations. Both are the
//! repository's job.
//!
//! ## Contract
//!
//! - `put` is idempotent in effect: an existing (key, tag) pair has its
//!   payload replaced and reports `created = false`.
//! - `list_versions` returns tags in **creation order**: the first time each
//!   tag was written for the key. Updates never move a tag. A tag removed and
//!   written again counts as a new creation and goes last.
//! - `get` hands out copies; no caller ever holds a reference into the index.
//! - Every single call is atomic with respect to the key it touches.

use grantstate_core::{BusinessKey, Document, PutOutcome, StateRecord, StateResult, VersionTag};

/// Point-in-time counters for an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Business keys with at least one stored version
    pub keys: usize,
    /// Stored records across all keys
    pub records: usize,
    /// Number of mutations applied since the index was created
    pub revision: u64,
}

/// Storage backend holding every [`StateRecord`]
pub trait DocumentIndex: Send + Sync {
    /// Insert or replace the record for (key, tag)
    fn put(&self, key: &BusinessKey, tag: &VersionTag, payload: Document)
        -> StateResult<PutOutcome>;

    /// Copy of the record for (key, tag), if stored
    fn get(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<Option<StateRecord>>;

    /// Tags stored under `key`, oldest creation first
    fn list_versions(&self, key: &BusinessKey) -> StateResult<Vec<VersionTag>>;

    /// Remove the record for (key, tag); true iff it existed
    fn remove(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<bool>;

    /// Current counters
    fn stats(&self) -> IndexStats;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
