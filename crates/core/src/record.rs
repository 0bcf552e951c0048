//! Stored state records
//!
//! A [`StateRecord`] is one (BusinessKey, VersionTag) → payload mapping. At
//! most one exists per pair; writing the pair again replaces `payload` and
//! bumps `updated_at` in place. No history is kept.

use serde::{Deserialize, Serialize};

use crate::key::{BusinessKey, VersionTag};
use crate::timestamp::Timestamp;

/// A JSON object payload
pub type Document = serde_json::Map<String, serde_json::Value>;

/// The unit of storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Resource this record belongs to
    pub key: BusinessKey,
    /// Version slot within the resource
    pub tag: VersionTag,
    /// Caller-supplied document
    pub payload: Document,
    /// When this (key, tag) pair was first written
    pub created_at: Timestamp,
    /// When the payload was last replaced
    pub updated_at: Timestamp,
}

impl StateRecord {
    /// Create a fresh record with both timestamps set to `at`
    pub fn new(key: BusinessKey, tag: VersionTag, payload: Document, at: Timestamp) -> Self {
        StateRecord {
            key,
            tag,
            payload,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Result of an index `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOutcome {
    /// True if the (key, tag) pair did not exist before
    pub created: bool,
}

impl PutOutcome {
    /// Outcome of inserting a new record
    pub const CREATED: PutOutcome = PutOutcome { created: true };

    /// Outcome of replacing an existing record's payload
    pub const UPDATED: PutOutcome = PutOutcome { created: false };
}
