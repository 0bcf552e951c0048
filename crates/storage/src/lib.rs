//! Storage layer for grantstate
//!
//! This crate implements the Document Index behind one trait:
//! - DocumentIndex: put / get / list_versions / remove contract
//! - ShardedIndex: in-memory DashMap sharded by business key
//! - LogIndex: ShardedIndex plus an append-only checksummed log, replayed on open
//!
//! Neither backend decides which version is effective; that lives in the
//! engine's resolver.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frame;
pub mod index;
pub mod log;
pub mod sharded;

pub use index::{DocumentIndex, IndexStats};
pub use log::{CompactionReport, DurabilityMode, LogIndex, RecoveryReport, LOG_FILE_NAME};
pub use sharded::{ShardedIndex, VersionSet};
