//! Error types for command execution.
//!
//! All errors from command execution are represented by the [`Error`] enum.
//! These errors are:
//! - **Structured**: each variant has typed fields
//! - **Serializable**: can be converted to/from JSON
//! - **Opaque where needed**: storage failures never leak medium details to
//!   clients; the detail is logged instead

use serde::{Deserialize, Serialize};

/// Command execution errors
///
/// | Variant | HTTP |
/// |---------|------|
/// | `MalformedRequest` | 400 |
/// | `NotFound` | 404 |
/// | `Internal` | 500 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// Missing or invalid attribute, tag or payload
    #[error("{reason}")]
    MalformedRequest {
        /// What was wrong
        reason: String,
    },

    /// No version stored for the key
    #[error("no state found for {key}")]
    NotFound {
        /// Display form of the business key
        key: String,
    },

    /// Storage or invariant failure
    #[error("internal error: {reason}")]
    Internal {
        /// Client-safe description
        reason: String,
    },
}

impl Error {
    /// HTTP status code class of this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MalformedRequest { .. } => 400,
            Error::NotFound { .. } => 404,
            Error::Internal { .. } => 500,
        }
    }

    /// Shorthand for a `MalformedRequest`
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedRequest {
            reason: reason.into(),
        }
    }
}

/// Result alias for executor operations
pub type Result<T> = std::result::Result<T, Error>;
