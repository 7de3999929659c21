//! Error types for credential handling.
//!
//! Signing itself cannot fail; an empty or wrong secret still produces a
//! signature, which the server then rejects.

/// Errors that can occur while loading credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required credential variable is absent or empty.
    #[error("missing credential: {0}")]
    MissingCredential(String),
}
