//! Error types for the apiconsole core.

/// Core error type for apiconsole infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The resolved call description cannot be turned into a request.
    #[error("invalid call: {0}")]
    InvalidCall(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for apiconsole operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;
