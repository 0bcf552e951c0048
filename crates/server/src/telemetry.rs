//! Logging setup for the `grantstate` binary
//!
//! Filter directives come from `GRANTSTATE_LOG` (same syntax as `RUST_LOG`),
//! defaulting to `info`. Library code only emits events; installing a
//! subscriber is left to the binary and tests.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives
pub const LOG_ENV_VAR: &str = "GRANTSTATE_LOG";

/// Build the filter from `GRANTSTATE_LOG`, ignoring invalid directives
pub fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

/// Install the global fmt subscriber
///
/// Returns false if a subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}
