//! Integration test helpers
//!
//! Spins up a minimal account service on an ephemeral port so the HTTP
//! transport is exercised end to end, wire format included.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use vestibule_core::{LoginRequest, SignupRequest};

pub const VALID_TOKEN: &str = "tok123";

// Install the subscriber once for the whole test binary; run with
// TEST_LOG=1 to see client traces from failing tests.
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .try_init()
            .ok();
    }
});

/// Counters exposed to assertions
pub struct StubState {
    pub me_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

pub struct TestApp {
    pub address: String,
    pub state: Arc<StubState>,
}

/// Bind the stub account service and return its address
pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let state = Arc::new(StubState {
        me_calls: AtomicUsize::new(0),
        list_calls: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/me", get(me))
        .route("/users", get(users))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind stub server");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server failed");
    });

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        state,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn login(
    State(_state): State<Arc<StubState>>,
    Json(body): Json<LoginRequest>,
) -> (StatusCode, Json<Value>) {
    if body.identifier == "ann" && body.secret == "secret" {
        (
            StatusCode::OK,
            Json(json!({
                "access": VALID_TOKEN,
                "user": { "id": "u1", "name": "Ann" },
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid investor id or password" })),
        )
    }
}

async fn signup(
    State(_state): State<Arc<StubState>>,
    Json(body): Json<SignupRequest>,
) -> (StatusCode, Json<Value>) {
    if body.email == "taken@x.com" {
        (
            StatusCode::CONFLICT,
            Json(json!({ "message": "email already registered" })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "access": VALID_TOKEN,
                "user": { "id": "u9", "name": body.name },
            })),
        )
    }
}

async fn me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.me_calls.fetch_add(1, Ordering::SeqCst);

    if bearer(&headers) == Some(VALID_TOKEN) {
        (
            StatusCode::OK,
            Json(json!({
                "user": { "id": "u1", "name": "Ann", "email": "a@x.com", "role": "admin" },
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid token" })),
        )
    }
}

async fn users(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.list_calls.fetch_add(1, Ordering::SeqCst);

    if bearer(&headers) != Some(VALID_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid token" })),
        );
    }

    let directory = [
        json!({ "id": "u1", "name": "Ann", "email": "a@x.com", "role": "admin",
                "investment_type": "gold", "duration": 5 }),
        json!({ "id": "u2", "name": "Alice", "email": "alice@x.com", "role": "user",
                "investment_type": "silver", "duration": 3 }),
        json!({ "id": "u3", "name": "Bob", "email": "b@x.com", "role": "user",
                "investment_type": "gold", "duration": 1 }),
    ];

    let needle = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let matching: Vec<Value> = directory
        .iter()
        .filter(|entry| {
            needle.is_empty()
                || entry["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
                || entry["email"]
                    .as_str()
                    .is_some_and(|email| email.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    (StatusCode::OK, Json(json!(matching)))
}
