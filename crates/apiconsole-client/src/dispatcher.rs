//! Performing one signed HTTP call.
//!
//! [`Dispatch`] is the seam between request preparation and the network. The
//! production implementation, [`ReqwestDispatcher`], sends exactly one request
//! per call and never retries. Cancellation aborts the in-flight call and is
//! reported as [`DispatchError::Cancelled`], never as a transport failure.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use apiconsole_core::ConsoleConfig;
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DispatchError;

/// A signed request ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Final URL, query string included and proxy rewrite applied.
    pub url: Url,
    /// Signed headers, `Authorization` included.
    pub headers: BTreeMap<String, String>,
    /// Body bytes; exactly the bytes whose hash was signed.
    pub body: Vec<u8>,
}

/// The outcome of one network exchange that produced a response.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status.
    pub status_text: String,
    /// Parsed JSON body; `null` for an empty body.
    pub body: Value,
    /// Wall-clock duration of the exchange in milliseconds.
    pub elapsed_ms: u64,
}

impl ApiResponse {
    /// Build a response, deriving the status text from the code.
    #[must_use]
    pub fn new(status: u16, body: Value, elapsed: Duration) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_owned();
        Self {
            status,
            status_text,
            body,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one signed HTTP call.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Send `request`, aborting if `cancel` fires first.
    async fn dispatch(
        &self,
        request: OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, DispatchError>;
}

/// [`Dispatch`] implementation backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client from the console configuration.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self::new(client))
    }

    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, DispatchError> {
        let start = Instant::now();
        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let elapsed = start.elapsed();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|source| {
                warn!(status, len = bytes.len(), "Response body is not JSON");
                DispatchError::Decode { status, source }
            })?
        };

        let response = ApiResponse::new(status, body, elapsed);
        debug!(
            method = %request.method,
            url = %request.url,
            status,
            elapsed_ms = response.elapsed_ms,
            "Received response"
        );

        Ok(response)
    }
}

#[async_trait]
impl Dispatch for ReqwestDispatcher {
    async fn dispatch(
        &self,
        request: OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, DispatchError> {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Request aborted by cancellation");
                Err(DispatchError::Cancelled)
            }
            result = self.send(request) => result,
        }
    }
}
