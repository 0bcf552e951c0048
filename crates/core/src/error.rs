//! Error types for the state store
//!
//! Every failure the core can raise is a [`StateError`]. The taxonomy is
//! deliberately small:
//!
//! | Variant | Cause | HTTP |
//! |---------|-------|------|
//! | `MalformedRequest` | Missing or invalid attributes / payload shape | 400 |
//! | `NotFound` | BusinessKey has no stored (or remaining) version | 404 |
//! | `Storage` | Storage medium failure (log I/O, encoding) | 500 |
//! | `Internal` | Invariant violation | 500 |
//!
//! None of these are retried inside the store. Authentication failures are a
//! boundary concern and never appear here.

use std::io;
use thiserror::Error;

use crate::key::BusinessKey;

/// Result type alias for state store operations
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Error types for the state store
#[derive(Debug, Error)]
pub enum StateError {
    /// Request is missing an attribute, or an attribute/payload has the wrong shape
    #[error("malformed request: {reason}")]
    MalformedRequest {
        /// What was wrong with the request
        reason: String,
    },

    /// No version is stored for the business key
    #[error("no state found for {key}")]
    NotFound {
        /// Display form of the business key
        key: String,
    },

    /// The storage medium failed (I/O, encoding, corruption)
    #[error("storage error: {reason}")]
    Storage {
        /// Underlying failure description
        reason: String,
    },

    /// Internal invariant violation
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the violated invariant
        reason: String,
    },
}

impl StateError {
    /// Build a `MalformedRequest` error
    pub fn malformed(reason: impl Into<String>) -> Self {
        StateError::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Build a `NotFound` error for a business key
    pub fn not_found(key: &BusinessKey) -> Self {
        StateError::NotFound {
            key: key.to_string(),
        }
    }

    /// Build a `Storage` error
    pub fn storage(reason: impl Into<String>) -> Self {
        StateError::Storage {
            reason: reason.into(),
        }
    }

    /// Build an `Internal` error
    pub fn internal(reason: impl Into<String>) -> Self {
        StateError::Internal {
            reason: reason.into(),
        }
    }

    /// True if the error is caused by the client's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StateError::MalformedRequest { .. } | StateError::NotFound { .. }
        )
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound { .. })
    }

    /// True for `MalformedRequest`
    pub fn is_malformed(&self) -> bool {
        matches!(self, StateError::MalformedRequest { .. })
    }
}

impl From<io::Error> for StateError {
    fn from(e: io::Error) -> Self {
        StateError::storage(e.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::storage(format!("encoding: {}", e))
    }
}
