//! grantstate - versioned grant application state store
//!
//! Stores JSON state documents under compound business keys, with any
//! number of caller-tagged versions per key. Version-agnostic reads and
//! deletes act on the *effective* version: by default the most recently
//! created one. Erasing it uncovers the previous one.
//!
//! # Quick Start
//!
//! ```ignore
//! use grantstate::{KeySchema, StateRepository};
//!
//! let schema = KeySchema::grant_application();
//! let repo = StateRepository::ephemeral();
//!
//! let key = schema.key(["b1", "u1", "adding-value"])?;
//! repo.upsert(&key, &schema.tag("R1")?, serde_json::Map::new())?;
//! let state = repo.fetch(&key)?;
//! ```
//!
//! # Architecture
//!
//! The HTTP server lives in `grantstate-server`. This crate re-exports the
//! embeddable layers: core types, the repository and the command executor.

pub use grantstate_core::{
    BusinessKey, Document, KeySchema, PutOutcome, StateError, StateRecord, StateResult,
    VersionTag,
};
pub use grantstate_engine::{RepositoryBuilder, ResolutionPolicy, StateRepository, StorageBackend};
pub use grantstate_executor::{Command, Error, Executor, Output, RequestGate};
