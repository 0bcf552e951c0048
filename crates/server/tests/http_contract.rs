//! HTTP contract tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot`:
//! status codes, response headers, error bodies, request-id echo,
//! authentication and the erase-uncovers-previous-version flow.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use grantstate_server::{build_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Helpers
// ============================================================================

fn app_with(config: ServerConfig) -> Router {
    let repo = config.repository_builder().unwrap().build().unwrap();
    let state = AppState::new(Arc::new(repo), &config).unwrap();
    build_router(state)
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

fn farm_app(secret: &str) -> Router {
    let mut config = ServerConfig::default();
    config.key.attributes = vec!["sbi".into(), "grantCode".into()];
    config.auth.mode = "basic".into();
    config.auth.token = secret.into();
    app_with(config)
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        headers,
        body,
    }
}

fn post(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/state")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_query(method: Method, query: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(format!("/state?{}", query))
        .body(Body::empty())
        .unwrap()
}

fn authed(mut request: Request<Body>, secret: &str) -> Request<Body> {
    let value = format!("Basic {}", STANDARD.encode(secret));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, value.parse().unwrap());
    request
}

struct Ids {
    business: String,
    user: String,
}

impl Ids {
    fn fresh() -> Self {
        Self {
            business: Uuid::new_v4().to_string(),
            user: Uuid::new_v4().to_string(),
        }
    }

    fn body(&self, version: &str, state: Value) -> Value {
        json!({
            "businessId": self.business,
            "userId": self.user,
            "grantId": "adding-value",
            "grantVersion": version,
            "state": state
        })
    }

    fn query(&self) -> String {
        format!(
            "businessId={}&userId={}&grantId=adding-value",
            self.business, self.user
        )
    }
}

fn assert_json_headers(reply: &Reply) {
    assert_eq!(
        reply.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(reply.headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
}

// ============================================================================
// POST /state
// ============================================================================

#[tokio::test]
async fn test_post_creates_then_updates() {
    let app = app();
    let ids = Ids::fresh();

    let reply = send(&app, post(ids.body("R2", json!({})))).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body, json!({"success": true, "created": true}));
    assert_json_headers(&reply);

    let reply = send(&app, post(ids.body("R2", json!({"property": "updated"})))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"success": true, "updated": true}));
}

#[tokio::test]
async fn test_post_rejects_bad_bodies() {
    let app = app();

    let reply = send(&app, post(json!({"invalid": "invalid"}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["statusCode"], 400);
    assert_eq!(reply.body["error"], "Bad Request");
    assert_json_headers(&reply);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/state")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let mut missing = Ids::fresh().body("1", json!({}));
    missing.as_object_mut().unwrap().remove("userId");
    let reply = send(&app, post(missing)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "missing required attribute 'userId'");
}

// ============================================================================
// GET /state
// ============================================================================

#[tokio::test]
async fn test_get_returns_latest_payload() {
    let app = app();
    let ids = Ids::fresh();

    send(&app, post(ids.body("1", json!({"a": 1})))).await;
    send(&app, post(ids.body("1", json!({"a": 2})))).await;

    let reply = send(&app, with_query(Method::GET, &ids.query())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"a": 2}));
    assert_json_headers(&reply);
}

#[tokio::test]
async fn test_get_ignores_version_param() {
    let app = app();
    let ids = Ids::fresh();
    for (v, r) in [("1", "R1"), ("2", "R2"), ("3", "R3")] {
        let reply = send(&app, post(ids.body(v, json!({ "grantVersion": r })))).await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let query = format!("{}&grantVersion=1", ids.query());
    let reply = send(&app, with_query(Method::GET, &query)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"grantVersion": "R3"}));
}

#[tokio::test]
async fn test_get_errors() {
    let app = app();
    let ids = Ids::fresh();

    let reply = send(&app, with_query(Method::GET, &ids.query())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["statusCode"], 404);
    assert_eq!(reply.body["error"], "Not Found");

    let query = format!("businessId={}&userId={}", ids.business, ids.user);
    let reply = send(&app, with_query(Method::GET, &query)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let query = format!("{}&page=2", ids.query());
    let reply = send(&app, with_query(Method::GET, &query)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlong_key_on_read_and_delete_is_not_found() {
    let app = app();
    let query = format!("businessId={}&userId=u&grantId=g", "x".repeat(300));

    let reply = send(&app, with_query(Method::GET, &query)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(&app, with_query(Method::DELETE, &query)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repeated_version_param_is_ignored() {
    let app = app();
    let ids = Ids::fresh();
    send(&app, post(ids.body("1", json!({"n": 1})))).await;

    let query = format!("{}&grantVersion=1&grantVersion=9", ids.query());
    let reply = send(&app, with_query(Method::GET, &query)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"n": 1}));
}

// ============================================================================
// DELETE /state
// ============================================================================

#[tokio::test]
async fn test_delete_uncovers_previous_version() {
    let app = app();
    let ids = Ids::fresh();
    for (v, r) in [("1", "R1"), ("2", "R2"), ("3", "R3")] {
        send(&app, post(ids.body(v, json!({ "grantVersion": r })))).await;
    }

    let reply = send(&app, with_query(Method::DELETE, &ids.query())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"success": true, "deleted": true}));

    let reply = send(&app, with_query(Method::GET, &ids.query())).await;
    assert_eq!(reply.body, json!({"grantVersion": "R2"}));

    send(&app, with_query(Method::DELETE, &ids.query())).await;
    send(&app, with_query(Method::DELETE, &ids.query())).await;
    let reply = send(&app, with_query(Method::DELETE, &ids.query())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Authentication (farm deployment: sbi + grantCode, Basic)
// ============================================================================

#[tokio::test]
async fn test_basic_auth_guards_state_routes() {
    let secret = "grants-ui-backend";
    let app = farm_app(secret);
    let sbi = "106284736";
    let body = json!({
        "sbi": sbi,
        "grantCode": "test-grant",
        "grantVersion": "1",
        "state": {"step": 1}
    });
    let query = format!("sbi={}&grantCode=test-grant", sbi);

    let reply = send(&app, post(body.clone())).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["statusCode"], 401);
    assert_eq!(reply.body["error"], "Unauthorized");

    let reply = send(&app, authed(post(body.clone()), "wrong")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, authed(post(body), secret)).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = send(&app, with_query(Method::DELETE, &query)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, authed(with_query(Method::DELETE, &query), secret)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&app, authed(with_query(Method::GET, &query), secret)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(
        &app,
        authed(with_query(Method::DELETE, "sbi=106284736"), secret),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Health and tracing
// ============================================================================

#[tokio::test]
async fn test_health_is_open() {
    let app = farm_app("secret");
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"message": "success"}));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let id = Uuid::new_v4().to_string();

    let mut request = with_query(Method::GET, &Ids::fresh().query());
    request
        .headers_mut()
        .insert("x-cdp-request-id", id.parse().unwrap());
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.headers.get("x-cdp-request-id").unwrap(), id.as_str());

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let reply = send(&app, request).await;
    assert!(reply.headers.get("x-cdp-request-id").is_none());
}

// ============================================================================
// Durable backend
// ============================================================================

#[tokio::test]
async fn test_log_backend_survives_restart() {
    let temp = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.storage.backend = "log".into();
    config.storage.data_dir = temp.path().to_path_buf();
    let ids = Ids::fresh();

    {
        let app = app_with(config.clone());
        send(&app, post(ids.body("1", json!({"v": 1})))).await;
        send(&app, post(ids.body("2", json!({"v": 2})))).await;
        send(&app, with_query(Method::DELETE, &ids.query())).await;
    }

    let app = app_with(config);
    let reply = send(&app, with_query(Method::GET, &ids.query())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"v": 1}));
}
