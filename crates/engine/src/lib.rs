//! State engine for grantstate
//!
//! This crate owns the semantics of the store:
//! - StateRepository: upsert / fetch / erase over a DocumentIndex
//! - ResolutionPolicy: which stored version a version-agnostic call acts on
//! - RepositoryBuilder: backend, lock stripes and policy selection
//!
//! The repository is synchronous. It is built once and shared by `Arc`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod repository;
pub mod resolver;

pub use repository::{RepositoryBuilder, StateRepository, StorageBackend};
pub use resolver::ResolutionPolicy;
