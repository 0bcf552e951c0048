//! HTTP boundary for grantstate
//!
//! | Route | Success | Errors |
//! |-------|---------|--------|
//! | `POST /state` | 201 created / 200 updated | 400, 401 |
//! | `GET /state?<key>` | 200, effective payload | 400, 401, 404 |
//! | `DELETE /state?<key>` | 200 | 400, 401, 404 |
//! | `GET /health` | 200 | - |
//!
//! `/health` is never authenticated. Every response passes through the
//! request-id layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod telemetry;
pub mod trace;

use std::sync::Arc;

use axum::http::HeaderName;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use grantstate_engine::StateRepository;
use grantstate_executor::{Executor, RequestGate};
use tracing::info;

pub use auth::AuthMode;
pub use config::{ConfigError, ServerConfig, CONFIG_FILE_NAME};
pub use error::ApiError;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command dispatcher over the repository
    pub executor: Executor,
    /// Request validation for the configured key schema
    pub gate: Arc<RequestGate>,
    /// Credential check for `/state`
    pub auth: Arc<AuthMode>,
    /// Header echoed on every response
    pub trace_header: HeaderName,
}

impl AppState {
    /// Assemble handler state from a repository and validated config
    pub fn new(repo: Arc<StateRepository>, config: &ServerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            executor: Executor::new(repo),
            gate: Arc::new(RequestGate::new(config.key_schema()?)),
            auth: Arc::new(config.auth_mode()?),
            trace_header: config.trace_header_name()?,
        })
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let state_routes = Router::new()
        .route(
            "/state",
            get(routes::fetch_state)
                .post(routes::upsert_state)
                .delete(routes::erase_state),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(state_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::propagate_request_id,
        ))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        target: "grantstate::http",
        %addr,
        auth = state.auth.scheme(),
        "Listening"
    );
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
