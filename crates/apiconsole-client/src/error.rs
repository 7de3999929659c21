//! Error types for request dispatch.
//!
//! A transport failure (the call never produced a response) and a
//! cancellation are distinct variants; a non-2xx response is NOT an error at
//! this layer and comes back as a normal [`ApiResponse`](crate::ApiResponse).

use apiconsole_core::ConsoleError;

/// Errors that can occur while building or performing one signed call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The call description could not be turned into a request.
    #[error(transparent)]
    Call(#[from] ConsoleError),

    /// The endpoint, path or proxy do not form a valid URL.
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The HTTP method is not a valid token.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller cancelled the call before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// A response arrived but its body is not JSON.
    #[error("response body (HTTP {status}) is not valid JSON: {source}")]
    Decode {
        /// HTTP status of the undecodable response.
        status: u16,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

impl DispatchError {
    /// Whether this error is a cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
