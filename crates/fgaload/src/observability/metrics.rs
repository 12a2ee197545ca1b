//! Prometheus metrics for the load generator.
//!
//! The client records through the `metrics` facade; this module installs the
//! Prometheus recorder and, when a listen address is configured, serves the
//! text exposition on `/metrics` for the duration of the run.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared handle used to render metrics.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,

    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Installs the global Prometheus recorder and describes every metric.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    fgaload_client::telemetry::describe_metrics();

    Ok(MetricsState::new(handle))
}

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for `GET /metrics`.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

pub fn metrics_router(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Binds `addr` and serves `/metrics` in the background.
///
/// The task runs until aborted or the runtime shuts down.
pub async fn serve_metrics(
    state: MetricsState,
    addr: SocketAddr,
) -> Result<JoinHandle<()>, MetricsError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| MetricsError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    info!(addr = %local, "serving metrics");

    let router = metrics_router(state);
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            warn!(error = %err, "metrics server stopped");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn local_state() -> MetricsState {
        // A local recorder, so tests never touch the global one.
        MetricsState::new(PrometheusBuilder::new().build_recorder().handle())
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_prometheus_text() {
        let response = metrics_router(local_state())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = metrics_router(local_state())
            .oneshot(Request::get("/other").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_recorded_values_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(fgaload_client::telemetry::ASSERTIONS_TOTAL, "result" => "pass")
                .increment(2);
        });

        let rendered = state.render();
        assert!(rendered.contains("fgaload_assertions_total"));
        assert!(rendered.contains("result=\"pass\""));
    }
}
