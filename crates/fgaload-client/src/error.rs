//! Client error types.

use thiserror::Error;

/// Errors raised by the HTTP client.
///
/// Unexpected status codes are not errors here; callers turn them into
/// failed assertions.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The bearer token cannot be sent as a header value.
    #[error("invalid API token: not a valid header value")]
    InvalidToken,

    /// The base URI is empty or not http(s).
    #[error("invalid base URI: {uri}")]
    InvalidBaseUri { uri: String },

    /// Building the underlying HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request did not complete (connect, timeout, body read).
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
