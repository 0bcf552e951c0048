//! Error conversion from [`StateError`].

use grantstate_core::StateError;
use tracing::error;

use crate::Error;

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        match err {
            StateError::MalformedRequest { reason } => Error::MalformedRequest { reason },
            StateError::NotFound { key } => Error::NotFound { key },
            StateError::Storage { reason } => {
                error!(target: "grantstate::repo", %reason, "Storage failure");
                Error::Internal {
                    reason: "storage unavailable".to_string(),
                }
            }
            StateError::Internal { reason } => {
                error!(target: "grantstate::repo", %reason, "Invariant violation");
                Error::Internal {
                    reason: "internal error".to_string(),
                }
            }
        }
    }
}
