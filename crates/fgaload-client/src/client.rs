//! HTTP client for the OpenFGA-compatible API.
//!
//! One [`FgaClient`] is built per run and shared by every worker; the inner
//! `reqwest::Client` holds the connection pool.

use std::time::{Duration, Instant};

use fgaload_graph::schema::AUTHORIZATION_MODEL_JSON;
use fgaload_graph::TupleKey;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ClientError, ClientResult};
use crate::telemetry;

/// Default rate-limit header inspected on write and delete responses.
pub const DEFAULT_RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// Connection settings for the service under test.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URI, e.g. `http://localhost:8080`.
    pub base_uri: String,
    /// Store every request targets.
    pub store_id: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Response header carrying the remaining request quota.
    pub rate_limit_header: String,
}

impl ClientConfig {
    /// Creates a configuration with default timeout and rate-limit header.
    pub fn new(base_uri: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            store_id: store_id.into(),
            token: None,
            request_timeout: Duration::from_secs(30),
            rate_limit_header: DEFAULT_RATE_LIMIT_HEADER.to_string(),
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Write or delete payload for `POST /stores/{id}/write`.
#[derive(Debug, Serialize)]
pub struct WriteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writes: Option<TupleKeys<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletes: Option<TupleKeys<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_model_id: Option<&'a str>,
}

impl<'a> WriteRequest<'a> {
    /// A request writing `tuples`.
    pub fn writes(tuples: &'a [TupleKey], model_id: Option<&'a str>) -> Self {
        Self {
            writes: Some(TupleKeys { tuple_keys: tuples }),
            deletes: None,
            authorization_model_id: model_id,
        }
    }

    /// A request deleting `tuples`.
    pub fn deletes(tuples: &'a [TupleKey], model_id: Option<&'a str>) -> Self {
        Self {
            writes: None,
            deletes: Some(TupleKeys { tuple_keys: tuples }),
            authorization_model_id: model_id,
        }
    }
}

/// `{"tuple_keys": [...]}`
#[derive(Debug, Serialize)]
pub struct TupleKeys<'a> {
    pub tuple_keys: &'a [TupleKey],
}

/// Payload for `POST /stores/{id}/check`.
#[derive(Debug, Serialize)]
pub struct CheckRequest<'a> {
    pub tuple_key: &'a TupleKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_model_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateModelResponse {
    authorization_model_id: String,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    allowed: bool,
}

/// Result of posting the authorization model.
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub status: StatusCode,
    /// `authorization_model_id` from the body, if present.
    pub model_id: Option<String>,
    pub body: String,
}

/// Result of a write or delete batch.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub status: StatusCode,
    /// The rate-limit header reported no remaining quota.
    pub rate_limited: bool,
    pub body: String,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub status: StatusCode,
    /// Decoded `allowed`, `None` when the body had no boolean `allowed`.
    pub allowed: Option<bool>,
    pub latency: Duration,
}

/// HTTP client bound to one store.
#[derive(Debug, Clone)]
pub struct FgaClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl FgaClient {
    /// Builds a client. Fails on an unusable base URI or token.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base = config.base_uri.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUri {
                uri: config.base_uri.clone(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self { http, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{base}/stores/{store}/{path}`
    pub fn store_url(&self, path: &str) -> String {
        format!(
            "{}/stores/{}/{}",
            self.config.base_uri.trim().trim_end_matches('/'),
            self.config.store_id,
            path
        )
    }

    /// Posts the embedded authorization model.
    pub async fn write_model(&self) -> ClientResult<ModelOutcome> {
        const ENDPOINT: &str = "authorization-models";

        let start = Instant::now();
        let result = self
            .http
            .post(self.store_url(ENDPOINT))
            .body(AUTHORIZATION_MODEL_JSON)
            .send()
            .await;
        let response = finish(ENDPOINT, start, result)?;

        let status = response.status();
        let body = read_body(ENDPOINT, response).await?;
        let model_id = serde_json::from_str::<CreateModelResponse>(&body)
            .ok()
            .map(|parsed| parsed.authorization_model_id);

        Ok(ModelOutcome {
            status,
            model_id,
            body,
        })
    }

    /// Posts one write or delete batch.
    pub async fn write(&self, request: &WriteRequest<'_>) -> ClientResult<WriteOutcome> {
        const ENDPOINT: &str = "write";

        let start = Instant::now();
        let result = self
            .http
            .post(self.store_url(ENDPOINT))
            .json(request)
            .send()
            .await;
        let response = finish(ENDPOINT, start, result)?;

        let status = response.status();
        let rate_limited = quota_exhausted(response.headers(), &self.config.rate_limit_header);
        let body = read_body(ENDPOINT, response).await?;

        Ok(WriteOutcome {
            status,
            rate_limited,
            body,
        })
    }

    /// Issues one check.
    pub async fn check(
        &self,
        tuple_key: &TupleKey,
        model_id: Option<&str>,
    ) -> ClientResult<CheckOutcome> {
        const ENDPOINT: &str = "check";

        let request = CheckRequest {
            tuple_key,
            authorization_model_id: model_id,
        };

        let start = Instant::now();
        let result = self
            .http
            .post(self.store_url(ENDPOINT))
            .json(&request)
            .send()
            .await;
        let response = finish(ENDPOINT, start, result)?;

        let status = response.status();
        let body = read_body(ENDPOINT, response).await?;
        let latency = start.elapsed();
        let allowed = serde_json::from_str::<CheckResponse>(&body)
            .ok()
            .map(|parsed| parsed.allowed);

        trace!(%tuple_key, status = status.as_u16(), ?allowed, "check");

        Ok(CheckOutcome {
            status,
            allowed,
            latency,
        })
    }
}

fn finish(
    endpoint: &'static str,
    start: Instant,
    result: Result<Response, reqwest::Error>,
) -> ClientResult<Response> {
    let elapsed = start.elapsed();
    match result {
        Ok(response) => {
            telemetry::record_request(endpoint, Some(response.status().as_u16()), elapsed);
            Ok(response)
        }
        Err(source) => {
            telemetry::record_request(endpoint, None, elapsed);
            Err(ClientError::Transport { endpoint, source })
        }
    }
}

async fn read_body(endpoint: &'static str, response: Response) -> ClientResult<String> {
    response
        .text()
        .await
        .map_err(|source| ClientError::Transport { endpoint, source })
}

/// Whether `header` is present and reports zero remaining requests.
fn quota_exhausted(headers: &HeaderMap, header: &str) -> bool {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        == Some(0)
}
