//! Minimal OpenFGA stand-in for end-to-end runs.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use fgaload::LoadTestConfig;
use fgaload_graph::TupleKey;
use serde_json::{json, Value};

pub const STORE_ID: &str = "01HRUNSTORE";

#[derive(Default)]
pub struct FakeStore {
    pub tuples: Mutex<HashSet<TupleKey>>,
    pub checks: AtomicUsize,
    pub writes: AtomicUsize,
    /// Held after storing each write batch, before responding.
    pub write_delay: Duration,
}

pub struct FakeFga {
    pub addr: SocketAddr,
    pub store: Arc<FakeStore>,
}

impl FakeFga {
    /// Answers every check with `allowed: true`.
    pub async fn start() -> Self {
        Self::start_with_write_delay(Duration::ZERO).await
    }

    /// Like `start`, but each write batch is stored and then held for `delay`.
    /// Deletes are answered immediately.
    pub async fn start_with_write_delay(delay: Duration) -> Self {
        let store = Arc::new(FakeStore {
            write_delay: delay,
            ..FakeStore::default()
        });
        let router = Router::new()
            .route(
                "/stores/:store_id/authorization-models",
                post(|| async {
                    (
                        StatusCode::CREATED,
                        Json(json!({ "authorization_model_id": "01RUNMODEL" })),
                    )
                }),
            )
            .route("/stores/:store_id/write", post(write))
            .route("/stores/:store_id/check", post(check))
            .with_state(Arc::clone(&store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, store }
    }

    /// A small, seeded configuration pointed at this server.
    pub fn config(&self) -> LoadTestConfig {
        let mut config = LoadTestConfig::default();
        config.api.base_uri = format!("http://{}", self.addr);
        config.api.store_id = Some(STORE_ID.to_string());
        config.api.request_timeout_secs = 5;
        config.workload.total_users = 20;
        config.workload.total_repos = 50;
        config.workload.total_orgs = 3;
        config.workload.tuples_per_write = 10;
        config.workload.seed = Some(1234);
        config.run.duration_secs = Some(1);
        config.run.vus = Some(2);
        config.metrics.enabled = false;
        config
    }

    pub fn stored(&self) -> usize {
        self.store.tuples.lock().unwrap().len()
    }
}

fn keys(body: &Value, field: &str) -> Vec<TupleKey> {
    body[field]["tuple_keys"]
        .as_array()
        .map(|keys| {
            keys.iter()
                .filter_map(|key| serde_json::from_value(key.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

async fn write(State(store): State<Arc<FakeStore>>, Json(body): Json<Value>) -> Json<Value> {
    store.writes.fetch_add(1, Ordering::SeqCst);
    let writes = keys(&body, "writes");
    let is_write = !writes.is_empty();
    {
        let mut tuples = store.tuples.lock().unwrap();
        tuples.extend(writes);
        for key in keys(&body, "deletes") {
            tuples.remove(&key);
        }
    }
    if is_write && !store.write_delay.is_zero() {
        tokio::time::sleep(store.write_delay).await;
    }
    Json(json!({}))
}

async fn check(State(store): State<Arc<FakeStore>>) -> Json<Value> {
    store.checks.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "allowed": true }))
}
