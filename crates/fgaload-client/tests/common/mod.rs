//! In-process OpenFGA stand-in for client integration tests.
//!
//! Serves the three endpoints the load tester talks to and records every
//! request so tests can assert on what went over the wire.

// Each test file compiles this module separately and uses a different subset.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fgaload_client::{ClientConfig, FgaClient, Throttle};
use fgaload_graph::TupleKey;
use serde_json::{json, Value};

pub const STORE_ID: &str = "01HSTORE";
pub const MODEL_ID: &str = "01ABC";
pub const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// Behavior of the mock service.
#[derive(Debug, Clone)]
pub struct MockOptions {
    pub model_status: StatusCode,
    pub model_id: Option<String>,
    /// Zero-based indexes of write requests answered with 500.
    pub failing_writes: HashSet<usize>,
    /// Value of the rate-limit header on write responses.
    pub rate_limit_remaining: Option<u64>,
    pub check_status: StatusCode,
    /// Answer every check with `allowed: true`.
    pub allow_all: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            model_status: StatusCode::CREATED,
            model_id: Some(MODEL_ID.to_string()),
            failing_writes: HashSet::new(),
            rate_limit_remaining: None,
            check_status: StatusCode::OK,
            allow_all: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub model_bodies: Vec<String>,
    pub write_bodies: Vec<Value>,
    pub check_bodies: Vec<Value>,
    pub authorization: Vec<Option<String>>,
    pub store_ids: BTreeSet<String>,
}

pub struct MockState {
    options: MockOptions,
    tuples: Mutex<HashSet<TupleKey>>,
    recorded: Mutex<Recorded>,
    writes_seen: AtomicUsize,
}

impl MockState {
    fn note(&self, store_id: String, headers: &HeaderMap) {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.store_ids.insert(store_id);
        recorded.authorization.push(
            headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        );
    }
}

/// A running mock service.
pub struct MockFga {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockFga {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            options,
            tuples: Mutex::new(HashSet::new()),
            recorded: Mutex::new(Recorded::default()),
            writes_seen: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/stores/:store_id/authorization-models", post(write_model))
            .route("/stores/:store_id/write", post(write))
            .route("/stores/:store_id/check", post(check))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_uri(), STORE_ID).with_timeout(Duration::from_secs(5))
    }

    pub fn client(&self) -> Arc<FgaClient> {
        Arc::new(FgaClient::new(self.client_config()).unwrap())
    }

    /// Tuples currently stored.
    pub fn stored(&self) -> HashSet<TupleKey> {
        self.state.tuples.lock().unwrap().clone()
    }

    pub fn with_recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        f(&self.state.recorded.lock().unwrap())
    }

    /// Number of tuple keys carried by each write request, in arrival order.
    pub fn write_batch_sizes(&self, field: &str) -> Vec<usize> {
        self.with_recorded(|recorded| {
            recorded
                .write_bodies
                .iter()
                .map(|body| {
                    body[field]["tuple_keys"]
                        .as_array()
                        .map(Vec::len)
                        .unwrap_or(0)
                })
                .collect()
        })
    }
}

async fn write_model(
    State(state): State<Arc<MockState>>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.note(store_id, &headers);
    state.recorded.lock().unwrap().model_bodies.push(body);

    let options = &state.options;
    match &options.model_id {
        Some(id) if options.model_status == StatusCode::CREATED => {
            (StatusCode::CREATED, Json(json!({ "authorization_model_id": id }))).into_response()
        }
        _ => (
            options.model_status,
            Json(json!({ "code": "validation_error", "message": "rejected" })),
        )
            .into_response(),
    }
}

async fn write(
    State(state): State<Arc<MockState>>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.note(store_id, &headers);
    state.recorded.lock().unwrap().write_bodies.push(body.clone());

    let index = state.writes_seen.fetch_add(1, Ordering::SeqCst);
    let mut response_headers = HeaderMap::new();
    if let Some(remaining) = state.options.rate_limit_remaining {
        response_headers.insert(
            HeaderName::from_static(RATE_LIMIT_HEADER),
            HeaderValue::from_str(&remaining.to_string()).unwrap(),
        );
    }

    if state.options.failing_writes.contains(&index) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            response_headers,
            Json(json!({ "code": "internal_error", "message": "boom" })),
        )
            .into_response();
    }

    let mut tuples = state.tuples.lock().unwrap();
    for key in tuple_keys(&body, "writes") {
        tuples.insert(key);
    }
    for key in tuple_keys(&body, "deletes") {
        tuples.remove(&key);
    }

    (StatusCode::OK, response_headers, Json(json!({}))).into_response()
}

async fn check(
    State(state): State<Arc<MockState>>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.note(store_id, &headers);
    state.recorded.lock().unwrap().check_bodies.push(body.clone());

    let allowed = state.options.allow_all
        || serde_json::from_value::<TupleKey>(body["tuple_key"].clone())
            .map(|key| state.tuples.lock().unwrap().contains(&key))
            .unwrap_or(false);

    (state.options.check_status, Json(json!({ "allowed": allowed }))).into_response()
}

fn tuple_keys(body: &Value, field: &str) -> Vec<TupleKey> {
    body[field]["tuple_keys"]
        .as_array()
        .map(|keys| {
            keys.iter()
                .filter_map(|key| serde_json::from_value(key.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Counts pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct CountingThrottle {
    pauses: AtomicUsize,
}

impl CountingThrottle {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for CountingThrottle {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

/// `count` distinct reader tuples on one repo.
pub fn reader_tuples(count: usize) -> Vec<TupleKey> {
    (0..count)
        .map(|i| TupleKey::new(format!("user:{i}"), "reader", "repo:1"))
        .collect()
}

/// A base URI nothing listens on.
pub fn unreachable_base_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
