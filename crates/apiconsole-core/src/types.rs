//! Common type definitions shared across crates.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ConsoleError, ConsoleResult};

/// Cloud region identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region(String);

impl Region {
    /// Region used when nothing else is configured.
    pub const DEFAULT: &str = "cn-north-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-resolved API call as produced by the UI layer.
///
/// The payload only contains parameters the user enabled. It is an ordered
/// JSON object so that the request built from it is stable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCall {
    /// Service endpoint, e.g. `https://open.volcengineapi.com`.
    pub endpoint: String,
    /// Region used in the credential scope.
    #[serde(default)]
    pub region: Region,
    /// Service name used in the credential scope.
    pub service: String,
    /// The `Action` query parameter.
    pub action: String,
    /// The `Version` query parameter.
    pub version: String,
    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request path.
    #[serde(default = "default_pathname")]
    pub pathname: String,
    /// Enabled parameters.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Additional request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "POST".to_owned()
}

fn default_pathname() -> String {
    "/".to_owned()
}

impl ApiCall {
    /// Derive a sibling call against the same endpoint, region and service.
    ///
    /// Used for poll requests, which reuse everything but the action, version,
    /// method and payload of the submit call.
    #[must_use]
    pub fn sibling(
        &self,
        action: impl Into<String>,
        version: impl Into<String>,
        method: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            service: self.service.clone(),
            action: action.into(),
            version: version.into(),
            method: method.into(),
            pathname: self.pathname.clone(),
            payload,
            headers: self.headers.clone(),
        }
    }

    /// Check that the fields the signer and dispatcher rely on are present.
    pub fn validate(&self) -> ConsoleResult<()> {
        let required = [
            ("endpoint", &self.endpoint),
            ("service", &self.service),
            ("action", &self.action),
            ("version", &self.version),
            ("method", &self.method),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConsoleError::InvalidCall(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}
