//! HTTP client abstraction for testability

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;

use super::error::BackendError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP POST with a JSON body.
    ///
    /// Non-success statuses are returned as a normal [`HttpResponse`] so the
    /// caller can inspect error payloads; only transport failures are errors.
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, BackendError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, BackendError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: Vec<u8>,
    ) -> BoxFuture<'a, Result<HttpResponse, BackendError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| BackendError::Transport(format!("Failed to read response: {}", e)))?;

            Ok(HttpResponse::new(status, body.to_vec()))
        })
    }
}
