//! In-memory sharded document index
//!
//! DashMap keyed by [`BusinessKey`], with a small creation-ordered
//! [`VersionSet`] per key.
//!
//! # Design
//!
//! - DashMap: sharded by key hash, readers of different shards never block
//! - VersionSet: a Vec in creation order; a key holds a handful of versions,
//!   so a linear scan by tag beats any secondary map
//! - Empty sets are dropped so `stats().keys` counts live resources only
//!
//! # Thread Safety
//!
//! Every method locks at most one DashMap shard for its duration, so each
//! call is atomic per key. Multi-call sequences (resolve then remove) must be
//! serialized by the caller.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use grantstate_core::{
    BusinessKey, Document, PutOutcome, StateRecord, StateResult, Timestamp, VersionTag,
};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::index::{DocumentIndex, IndexStats};

/// One stored version of a key
#[derive(Debug, Clone)]
struct VersionSlot {
    tag: VersionTag,
    payload: Document,
    created_at: Timestamp,
    updated_at: Timestamp,
}

/// All versions stored under one key, oldest creation first
#[derive(Debug, Clone, Default)]
pub struct VersionSet {
    slots: Vec<VersionSlot>,
}

impl VersionSet {
    /// Insert a new slot at the end, or replace the payload of an existing one
    ///
    /// `created_at` is only used for new slots.
    fn upsert(
        &mut self,
        tag: &VersionTag,
        payload: Document,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> PutOutcome {
        if let Some(slot) = self.slots.iter_mut().find(|s| &s.tag == tag) {
            slot.payload = payload;
            slot.updated_at = updated_at;
            return PutOutcome::UPDATED;
        }
        self.slots.push(VersionSlot {
            tag: tag.clone(),
            payload,
            created_at,
            updated_at,
        });
        PutOutcome::CREATED
    }

    fn get(&self, tag: &VersionTag) -> Option<&VersionSlot> {
        self.slots.iter().find(|s| &s.tag == tag)
    }

    fn remove(&mut self, tag: &VersionTag) -> bool {
        match self.slots.iter().position(|s| &s.tag == tag) {
            Some(pos) => {
                // `remove`, not `swap_remove`: creation order must survive
                self.slots.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Tags in creation order
    pub fn tags(&self) -> Vec<VersionTag> {
        self.slots.iter().map(|s| s.tag.clone()).collect()
    }

    /// Number of stored versions
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no versions remain
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// In-memory [`DocumentIndex`]
///
/// # Example
///
/// ```ignore
/// use grantstate_storage::{DocumentIndex, ShardedIndex};
///
/// let index = ShardedIndex::new();
/// let outcome = index.put(&key, &tag, payload)?;
/// assert!(outcome.created);
/// ```
#[derive(Debug, Default)]
pub struct ShardedIndex {
    sets: DashMap<BusinessKey, VersionSet>,
    revision: AtomicU64,
}

impl ShardedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            sets: DashMap::new(),
            revision: AtomicU64::new(0),
        }
    }

    /// Create with room for `keys` business keys
    pub fn with_capacity(keys: usize) -> Self {
        Self {
            sets: DashMap::with_capacity(keys),
            revision: AtomicU64::new(0),
        }
    }

    /// Upsert with explicit timestamps
    ///
    /// Used by the log backend so replayed records keep their original
    /// `created_at` / `updated_at`.
    pub fn put_with_times(
        &self,
        key: &BusinessKey,
        tag: &VersionTag,
        payload: Document,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> PutOutcome {
        let outcome = match self.sets.get_mut(key) {
            Some(mut set) => set.upsert(tag, payload, created_at, updated_at),
            None => self
                .sets
                .entry(key.clone())
                .or_default()
                .upsert(tag, payload, created_at, updated_at),
        };
        self.revision.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Remove without going through the trait (infallible)
    pub fn remove_record(&self, key: &BusinessKey, tag: &VersionTag) -> bool {
        let removed = match self.sets.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let removed = occupied.get_mut().remove(tag);
                if occupied.get().is_empty() {
                    occupied.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        };
        if removed {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    /// True if (key, tag) is stored
    pub fn contains(&self, key: &BusinessKey, tag: &VersionTag) -> bool {
        self.sets
            .get(key)
            .map(|set| set.get(tag).is_some())
            .unwrap_or(false)
    }

    /// Copy of every record, grouped by key, each key in creation order
    pub fn snapshot(&self) -> Vec<StateRecord> {
        let mut records = Vec::new();
        for entry in self.sets.iter() {
            for slot in &entry.value().slots {
                records.push(StateRecord {
                    key: entry.key().clone(),
                    tag: slot.tag.clone(),
                    payload: slot.payload.clone(),
                    created_at: slot.created_at,
                    updated_at: slot.updated_at,
                });
            }
        }
        records
    }

    /// Total records across all keys
    pub fn total_records(&self) -> usize {
        self.sets.iter().map(|entry| entry.value().len()).sum()
    }
}

impl DocumentIndex for ShardedIndex {
    fn put(
        &self,
        key: &BusinessKey,
        tag: &VersionTag,
        payload: Document,
    ) -> StateResult<PutOutcome> {
        let now = Timestamp::now();
        Ok(self.put_with_times(key, tag, payload, now, now))
    }

    fn get(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<Option<StateRecord>> {
        Ok(self.sets.get(key).and_then(|set| {
            set.get(tag).map(|slot| StateRecord {
                key: key.clone(),
                tag: slot.tag.clone(),
                payload: slot.payload.clone(),
                created_at: slot.created_at,
                updated_at: slot.updated_at,
            })
        }))
    }

    fn list_versions(&self, key: &BusinessKey) -> StateResult<Vec<VersionTag>> {
        Ok(self
            .sets
            .get(key)
            .map(|set| set.tags())
            .unwrap_or_default())
    }

    fn remove(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<bool> {
        Ok(self.remove_record(key, tag))
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.sets.len(),
            records: self.total_records(),
            revision: self.revision.load(Ordering::Acquire),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
