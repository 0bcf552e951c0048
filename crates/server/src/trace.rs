//! Request tracing
//!
//! Every request runs inside a `request` span carrying method, path and the
//! caller's request id (the configured trace header, `x-cdp-request-id` by
//! default). The id is echoed verbatim on the response. It is never used
//! for anything else.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};

use crate::AppState;

/// Middleware opening the request span and echoing the trace header
pub async fn propagate_request_id(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request.headers().get(&state.trace_header).cloned();
    let span = info_span!(
        target: "grantstate::http",
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = request_id
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-"),
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            target: "grantstate::http",
            status = response.status().as_u16(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Request completed"
        );
    });

    if let Some(id) = request_id {
        response.headers_mut().insert(state.trace_header.clone(), id);
    }
    response
}
