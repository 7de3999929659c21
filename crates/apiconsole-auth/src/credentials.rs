//! Access key material used by the signer.
//!
//! [`Credentials`] are read-only inputs shared by every call. The `Debug`
//! implementation redacts the secret and session token so the struct can sit
//! inside traced spans without leaking.

use std::fmt;

use crate::error::AuthError;

/// Access key pair plus an optional session token.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// The access key ID, sent in clear inside the credential scope.
    pub access_key_id: String,
    /// The secret access key. Never leaves the process.
    pub secret_access_key: String,
    /// Temporary session token, sent as `X-Security-Token` when present.
    #[serde(default)]
    pub session_token: Option<String>,
}

impl Credentials {
    /// Create long-term credentials without a session token.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Load credentials from the process environment.
    ///
    /// Reads `ACCESS_KEY_ID` / `SECRET_ACCESS_KEY` / `SESSION_TOKEN`, falling
    /// back to `VOLC_ACCESSKEY` / `VOLC_SECRETKEY` / `VOLC_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] if the access key or the secret
    /// is absent.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials from an arbitrary key lookup. See [`Credentials::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        };

        let access_key_id = first(&["ACCESS_KEY_ID", "VOLC_ACCESSKEY"])
            .ok_or_else(|| AuthError::MissingCredential("ACCESS_KEY_ID".to_owned()))?;
        let secret_access_key = first(&["SECRET_ACCESS_KEY", "VOLC_SECRETKEY"])
            .ok_or_else(|| AuthError::MissingCredential("SECRET_ACCESS_KEY".to_owned()))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: first(&["SESSION_TOKEN", "VOLC_SESSION_TOKEN"]),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}
