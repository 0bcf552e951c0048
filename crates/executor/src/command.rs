//! Command enum defining every grantstate operation.
//!
//! Commands are:
//! - **Self-contained**: all parameters needed for execution are in the variant
//! - **Serializable**: can be logged or replayed as JSON
//! - **Validated**: built by the [`RequestGate`](crate::RequestGate), so keys
//!   and tags are already well-formed

use grantstate_core::{BusinessKey, Document, VersionTag};
use serde::{Deserialize, Serialize};

/// A self-contained, serializable operation
///
/// | Command | Output |
/// |---------|--------|
/// | `Ping` | `Pong` |
/// | `StateUpsert` | `Upserted` |
/// | `StateFetch` | `Document` |
/// | `StateErase` | `Erased` |
/// | `StateVersions` | `Versions` |
///
/// # Example
///
/// ```ignore
/// use grantstate_executor::Command;
///
/// let cmd = Command::StateUpsert {
///     key: schema.key(["b1", "u1", "adding-value"])?,
///     tag: schema.tag("R1")?,
///     state: serde_json::Map::new(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Liveness probe
    Ping,

    /// Insert or replace the record for (key, tag)
    StateUpsert {
        /// Resource being written
        key: BusinessKey,
        /// Version slot
        tag: VersionTag,
        /// New payload
        state: Document,
    },

    /// Payload of the effective version
    StateFetch {
        /// Resource being read
        key: BusinessKey,
    },

    /// Remove the effective version
    StateErase {
        /// Resource being erased
        key: BusinessKey,
    },

    /// Stored tags, oldest creation first
    StateVersions {
        /// Resource being listed
        key: BusinessKey,
    },
}

impl Command {
    /// Short operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::StateUpsert { .. } => "state_upsert",
            Command::StateFetch { .. } => "state_fetch",
            Command::StateErase { .. } => "state_erase",
            Command::StateVersions { .. } => "state_versions",
        }
    }

    /// True if the command can change stored state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::StateUpsert { .. } | Command::StateErase { .. }
        )
    }
}
