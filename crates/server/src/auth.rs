//! Request authentication
//!
//! One shared credential per deployment:
//!
//! | Mode | Header | Accepted when |
//! |------|--------|---------------|
//! | `none` | - | always |
//! | `basic` | `Authorization: Basic <b64>` | `<b64>` decodes to the configured secret |
//! | `bearer` | `Authorization: Bearer <token>` | token equals the configured token |
//!
//! Credentials are compared in constant time. A rejected request gets a
//! 401 before validation or storage runs.

use std::fmt;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::AppState;

/// Configured authentication scheme
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No authentication
    None,
    /// HTTP Basic carrying the base64 of a shared secret
    Basic {
        /// Raw secret bytes
        secret: Vec<u8>,
    },
    /// Static bearer token
    Bearer {
        /// Raw token bytes
        token: Vec<u8>,
    },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl AuthMode {
    /// Build from the `[auth]` config values
    pub fn from_config(mode: &str, token: &str) -> Result<Self, ConfigError> {
        let needs_token = |mode: AuthMode| {
            if token.is_empty() {
                Err(ConfigError::Invalid {
                    field: "auth.token",
                    reason: format!("required when auth.mode is \"{}\"", mode.scheme()),
                })
            } else {
                Ok(mode)
            }
        };
        match mode {
            "none" => Ok(AuthMode::None),
            "basic" => needs_token(AuthMode::Basic {
                secret: token.as_bytes().to_vec(),
            }),
            "bearer" => needs_token(AuthMode::Bearer {
                token: token.as_bytes().to_vec(),
            }),
            other => Err(ConfigError::Invalid {
                field: "auth.mode",
                reason: format!("'{}', expected \"none\", \"basic\" or \"bearer\"", other),
            }),
        }
    }

    /// Scheme name
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic { .. } => "basic",
            AuthMode::Bearer { .. } => "bearer",
        }
    }

    /// Check an `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> bool {
        let expected = match self {
            AuthMode::None => return true,
            AuthMode::Basic { secret } => secret,
            AuthMode::Bearer { token } => token,
        };
        let Some((scheme, credentials)) = header.and_then(|h| h.trim().split_once(' ')) else {
            return false;
        };
        let credentials = credentials.trim();

        match self {
            AuthMode::Basic { .. } if scheme.eq_ignore_ascii_case("basic") => {
                match STANDARD.decode(credentials) {
                    Ok(decoded) => constant_time_eq(&decoded, expected),
                    Err(_) => false,
                }
            }
            AuthMode::Bearer { .. } if scheme.eq_ignore_ascii_case("bearer") => {
                constant_time_eq(credentials.as_bytes(), expected)
            }
            _ => false,
        }
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests that fail [`AuthMode::authorize`]
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if !state.auth.authorize(header) {
        debug!(
            target: "grantstate::http",
            scheme = state.auth.scheme(),
            present = header.is_some(),
            "Rejected credentials"
        );
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}
