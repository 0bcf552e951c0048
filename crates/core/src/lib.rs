//! Core types for grantstate
//!
//! This crate defines the foundational types used throughout the store:
//! - BusinessKey / KeySchema: compound resource identity
//! - VersionTag: opaque writer-supplied version discriminator
//! - StateRecord / Document: the unit of storage
//! - Timestamp: record metadata clock
//! - StateError: error taxonomy
//! - Limits: attribute and tag size rules

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod limits;
pub mod record;
pub mod timestamp;

pub use error::{StateError, StateResult};
pub use key::{BusinessKey, KeyAttribute, KeySchema, VersionTag, DEFAULT_VERSION_FIELD, STATE_FIELD};
pub use limits::{Limits, TextError, MAX_ATTRIBUTE_LEN, MAX_KEY_ATTRIBUTES};
pub use record::{Document, PutOutcome, StateRecord};
pub use timestamp::Timestamp;
