//! Route handlers
//!
//! Handlers are thin: decode, hand the input to the [`RequestGate`], run the
//! command, shape the reply. The repository is synchronous: it takes stripe
//! locks and, with `durability = "always"`, syncs the log on every write, so
//! commands run on the blocking pool rather than on a runtime worker.
//!
//! [`RequestGate`]: grantstate_executor::RequestGate

use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use grantstate_executor::{Command, Error as CommandError, Output};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

const JSON_UTF8: &str = "application/json; charset=utf-8";

type QueryParams = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Serialize `body` with the store's standard headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "response encoding failed").into_response()
        }
    };
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Response, ApiError> {
    dispatch(&state, Command::Ping).await?;
    Ok(json_response(StatusCode::OK, &json!({ "message": "success" })))
}

/// `POST /state`
pub async fn upsert_state(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let body: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    let cmd = state.gate.write_command(body)?;
    match dispatch(&state, cmd).await? {
        Output::Upserted { created: true } => Ok(json_response(
            StatusCode::CREATED,
            &json!({ "success": true, "created": true }),
        )),
        Output::Upserted { created: false } => Ok(json_response(
            StatusCode::OK,
            &json!({ "success": true, "updated": true }),
        )),
        other => Err(unexpected(other)),
    }
}

/// `GET /state`
pub async fn fetch_state(State(state): State<AppState>, query: QueryParams) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|_| ApiError::InvalidQuery)?;
    let cmd = state.gate.fetch_command(&params)?;
    match dispatch(&state, cmd).await? {
        Output::Document(document) => Ok(json_response(StatusCode::OK, &document)),
        other => Err(unexpected(other)),
    }
}

/// `DELETE /state`
pub async fn erase_state(State(state): State<AppState>, query: QueryParams) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|_| ApiError::InvalidQuery)?;
    let cmd = state.gate.erase_command(&params)?;
    match dispatch(&state, cmd).await? {
        Output::Erased { .. } => Ok(json_response(
            StatusCode::OK,
            &json!({ "success": true, "deleted": true }),
        )),
        other => Err(unexpected(other)),
    }
}

/// Run `cmd` on the blocking pool
async fn dispatch(state: &AppState, cmd: Command) -> Result<Output, ApiError> {
    let executor = state.executor.clone();
    let output = tokio::task::spawn_blocking(move || executor.execute(cmd))
        .await
        .map_err(|e| {
            ApiError::Command(CommandError::Internal {
                reason: format!("command task failed: {}", e),
            })
        })??;
    Ok(output)
}

fn unexpected(output: Output) -> ApiError {
    ApiError::Command(CommandError::Internal {
        reason: format!("unexpected output {:?}", output),
    })
}
