//! Server configuration via `grantstate.toml`
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration: in-memory storage, no authentication, the
//! `businessId, userId, grantId` key schema.
//!
//! A handful of settings can be overridden from the environment, which wins
//! over the file:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GRANTSTATE_BIND` | `bind` |
//! | `GRANTSTATE_AUTH_MODE` | `auth.mode` |
//! | `GRANTSTATE_AUTH_TOKEN` | `auth.token` |
//! | `GRANTSTATE_DATA_DIR` | `storage.data_dir` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::http::HeaderName;
use grantstate_concurrency::DEFAULT_STRIPES;
use grantstate_core::KeySchema;
use grantstate_engine::{RepositoryBuilder, ResolutionPolicy, StorageBackend};
use grantstate_storage::DurabilityMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthMode;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "grantstate.toml";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("config file '{path}': {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse config file '{path}': {reason}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A field holds a value outside its domain
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[key]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    /// Business key attribute names, in key order
    pub attributes: Vec<String>,
    /// Name of the version field in write bodies and queries
    pub version_field: String,
    /// `"creation_order"` or `"lexical_order"`
    pub resolution: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        let schema = KeySchema::grant_application();
        Self {
            attributes: schema.attributes().to_vec(),
            version_field: schema.version_field().to_string(),
            resolution: ResolutionPolicy::default().as_str().to_string(),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// `"memory"` or `"log"`
    pub backend: String,
    /// Directory holding the state log
    pub data_dir: PathBuf,
    /// `"standard"` or `"always"`
    pub durability: String,
    /// Rewrite the log from live state at startup
    pub compact_on_open: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            data_dir: PathBuf::from("data"),
            durability: "standard".to_string(),
            compact_on_open: true,
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// `"none"`, `"basic"` or `"bearer"`
    pub mode: String,
    /// Shared secret (basic) or token (bearer)
    pub token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: "none".to_string(),
            token: String::new(),
        }
    }
}

/// Server configuration loaded from `grantstate.toml`
///
/// # Example
///
/// ```toml
/// bind = "0.0.0.0:3001"
///
/// [key]
/// attributes = ["sbi", "grantCode"]
///
/// [auth]
/// mode = "basic"
/// token = "shared-secret"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Request header echoed back and recorded on the request span
    pub trace_header: String,
    /// Number of key lock stripes
    pub lock_stripes: usize,
    /// Business key schema and version resolution
    pub key: KeyConfig,
    /// Storage backend
    pub storage: StorageConfig,
    /// Authentication
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            trace_header: "x-cdp-request-id".to_string(),
            lock_stripes: DEFAULT_STRIPES,
            key: KeyConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# grantstate configuration
#
# Listen address
bind = "127.0.0.1:3001"

# Request header echoed on every response
trace_header = "x-cdp-request-id"

# Key lock stripes; more stripes means fewer unrelated keys share a lock
lock_stripes = 64

[key]
# Business key attributes, in order. Farm deployments use ["sbi", "grantCode"]
attributes = ["businessId", "userId", "grantId"]
version_field = "grantVersion"
# "creation_order" = most recently created version is effective
# "lexical_order"  = greatest version string is effective
resolution = "creation_order"

[storage]
# "memory" (lost on restart) or "log" (append-only file in data_dir)
backend = "memory"
data_dir = "data"
# "standard" = flush per write, "always" = fsync per write
durability = "standard"
compact_on_open = true

[auth]
# "none", "basic" or "bearer"
mode = "none"
token = ""
"#
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    /// Apply `GRANTSTATE_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("GRANTSTATE_BIND") {
            self.bind = bind;
        }
        if let Some(mode) = lookup("GRANTSTATE_AUTH_MODE") {
            self.auth.mode = mode;
        }
        if let Some(token) = lookup("GRANTSTATE_AUTH_TOKEN") {
            self.auth.token = token;
        }
        if let Some(dir) = lookup("GRANTSTATE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        self.validate()
    }

    /// Check every field that has a restricted domain
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.trace_header_name()?;
        self.key_schema()?;
        self.resolution()?;
        self.backend()?;
        self.auth_mode()?;
        if self.lock_stripes == 0 {
            return Err(ConfigError::invalid("lock_stripes", "must be at least 1"));
        }
        Ok(())
    }

    /// Parsed listen address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::invalid("bind", format!("'{}': {}", self.bind, e)))
    }

    /// Parsed trace header name
    pub fn trace_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.trace_header.to_ascii_lowercase().as_bytes()).map_err(|_| {
            ConfigError::invalid(
                "trace_header",
                format!("'{}' is not a valid header name", self.trace_header),
            )
        })
    }

    /// Key schema from `[key]`
    pub fn key_schema(&self) -> Result<KeySchema, ConfigError> {
        KeySchema::new(self.key.attributes.iter().cloned(), self.key.version_field.clone())
            .map_err(|e| ConfigError::invalid("key.attributes", e.to_string()))
    }

    /// Resolution policy from `[key]`
    pub fn resolution(&self) -> Result<ResolutionPolicy, ConfigError> {
        ResolutionPolicy::parse(&self.key.resolution)
            .map_err(|e| ConfigError::invalid("key.resolution", e.to_string()))
    }

    /// Storage backend from `[storage]`
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        match self.storage.backend.as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "log" => {
                let durability = DurabilityMode::parse(&self.storage.durability)
                    .map_err(|e| ConfigError::invalid("storage.durability", e.to_string()))?;
                Ok(StorageBackend::Log {
                    dir: self.storage.data_dir.clone(),
                    durability,
                    compact_on_open: self.storage.compact_on_open,
                })
            }
            other => Err(ConfigError::invalid(
                "storage.backend",
                format!("'{}', expected \"memory\" or \"log\"", other),
            )),
        }
    }

    /// Authentication mode from `[auth]`
    pub fn auth_mode(&self) -> Result<AuthMode, ConfigError> {
        AuthMode::from_config(&self.auth.mode, &self.auth.token)
    }

    /// Repository builder with backend, stripes and policy applied
    pub fn repository_builder(&self) -> Result<RepositoryBuilder, ConfigError> {
        Ok(RepositoryBuilder::new()
            .backend(self.backend()?)
            .stripes(self.lock_stripes)
            .policy(self.resolution()?))
    }
}
