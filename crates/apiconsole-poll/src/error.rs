//! Run failure taxonomy.
//!
//! Every variant ends the current run. [`RunError::Cancelled`] is not a
//! failure; callers should check [`RunError::is_cancellation`] before
//! rendering an error.

use apiconsole_client::DispatchError;

/// Why a run did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The call never reached a server, or was aborted by the network.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call could not be built (bad endpoint, method or call fields).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A non-2xx response, with the server's message when it sent one.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-reported message or `HTTP Error <status>`.
        message: String,
    },

    /// A 2xx response whose body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// A configured path expression found no value.
    #[error("could not find ID at path '{path}'")]
    Extraction {
        /// The path that was looked up.
        path: String,
    },

    /// The poll status reported the configured failure value.
    #[error("task failed with status '{status}'{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    TaskFailed {
        /// The failure status value.
        status: String,
        /// Message found at the configured error path.
        message: Option<String>,
    },

    /// The wall-clock budget ran out while polling.
    #[error("polling timed out after {seconds}s")]
    Timeout {
        /// The configured budget.
        seconds: u64,
    },

    /// The caller stopped the run.
    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// Whether this is a caller-initiated stop rather than a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Map a dispatch failure that produced no usable response.
    #[must_use]
    pub fn from_dispatch(err: &DispatchError) -> Self {
        match err {
            DispatchError::Cancelled => Self::Cancelled,
            DispatchError::Transport(e) => Self::Transport(e.to_string()),
            DispatchError::Decode { status, .. } if !(200..300).contains(status) => Self::Http {
                status: *status,
                message: format!("HTTP Error {status}"),
            },
            DispatchError::Decode { .. } => Self::Decode(err.to_string()),
            DispatchError::Call(_)
            | DispatchError::InvalidUrl { .. }
            | DispatchError::InvalidMethod(_) => Self::InvalidRequest(err.to_string()),
        }
    }
}
