//! Concurrency layer for grantstate
//!
//! Per-key mutual exclusion for the state repository:
//! - LockTable: fixed set of reader/writer stripes indexed by key hash
//!
//! Operations on different business keys never wait on each other unless
//! their keys collide on a stripe.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock_table;

pub use lock_table::{KeyReadGuard, KeyWriteGuard, LockTable, DEFAULT_STRIPES};
