//! Configuration management for apiconsole.
//!
//! All configuration is driven by environment variables. Credentials are not
//! part of this struct; they are loaded separately so the config can be
//! logged freely.

use crate::types::Region;

/// Global configuration for the console client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Endpoint used when a call does not carry its own.
    pub default_endpoint: String,
    /// Region used when a call does not carry its own.
    pub default_region: Region,
    /// Optional forwarding-proxy URL prefix.
    pub proxy_url: Option<String>,
    /// Transport connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Log level.
    pub log_level: String,
}

impl ConsoleConfig {
    /// Default service endpoint.
    pub const DEFAULT_ENDPOINT: &str = "https://open.volcengineapi.com";
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            default_endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            default_region: Region::default(),
            proxy_url: None,
            connect_timeout_secs: 10,
            log_level: "info".to_owned(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values leave the default in place.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("APICONSOLE_ENDPOINT") {
            config.default_endpoint = v;
        }
        if let Some(v) = lookup("APICONSOLE_REGION") {
            config.default_region = Region::new(v);
        }
        if let Some(v) = lookup("APICONSOLE_PROXY_URL") {
            if !v.trim().is_empty() {
                config.proxy_url = Some(v.trim().to_owned());
            }
        }
        if let Some(v) = lookup("APICONSOLE_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                config.connect_timeout_secs = secs;
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}
