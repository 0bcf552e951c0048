//! Output enum for command execution results.
//!
//! Every command produces exactly one output variant; see the table on
//! [`Command`](crate::Command).

use grantstate_core::{Document, VersionTag};
use serde::{Deserialize, Serialize};

/// Successful command results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// Reply to `Ping`
    Pong {
        /// Crate version
        version: String,
    },

    /// Reply to `StateUpsert`
    Upserted {
        /// True if the (key, tag) pair was new
        created: bool,
    },

    /// Effective payload, reply to `StateFetch`
    Document(Document),

    /// Reply to `StateErase`
    Erased {
        /// Tag of the removed version
        tag: VersionTag,
    },

    /// Reply to `StateVersions`
    Versions(Vec<VersionTag>),
}
