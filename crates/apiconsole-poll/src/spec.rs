//! Asynchronous polling configuration.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::warn;

/// How to follow up an asynchronous submit call.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncPollSpec {
    /// Action of the status call.
    pub poll_action: String,
    /// Version of the status call.
    pub poll_version: String,
    /// HTTP method of the status call.
    #[serde(default = "default_poll_method")]
    pub poll_method: String,
    /// Where the task ID sits in the submit response, e.g. `Result.TaskId`.
    pub submit_response_id_path: String,
    /// Payload key the task ID is sent under.
    pub poll_id_param_key: String,
    /// Where the status sits in the poll response.
    pub poll_status_path: String,
    /// Status value meaning the task succeeded.
    pub poll_success_value: String,
    /// Status value meaning the task failed, if the service has one.
    #[serde(default)]
    pub poll_failed_value: Option<String>,
    /// Where a failure message sits in the poll response.
    #[serde(default)]
    pub poll_error_path: Option<String>,
    /// JSON object source merged into every poll payload.
    #[serde(default = "default_static_params")]
    pub static_params: String,
    /// Whether the submit payload is merged into every poll payload.
    #[serde(default)]
    pub inherit_submit_params: bool,
    /// Wait between poll calls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wall-clock budget for the whole run, measured from submission.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Accepted for configuration compatibility. Not enforced: the run is
    /// bounded by `timeout_seconds` only.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

fn default_poll_method() -> String {
    "POST".to_owned()
}

fn default_static_params() -> String {
    "{}".to_owned()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_timeout_seconds() -> u64 {
    300
}

impl AsyncPollSpec {
    /// Wait between poll calls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wall-clock budget of a run.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Parse [`static_params`](Self::static_params).
    ///
    /// Static params are supplementary: a source that is not a JSON object is
    /// logged and ignored rather than failing the run.
    #[must_use]
    pub fn parsed_static_params(&self) -> Option<Map<String, Value>> {
        let source = self.static_params.trim();
        if source.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(source) {
            Ok(Value::Object(map)) => Some(map),
            Ok(other) => {
                warn!(kind = json_kind(&other), "Static poll params are not a JSON object, skipping");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse static poll params, skipping");
                None
            }
        }
    }

    /// Build the payload of one poll call.
    ///
    /// Starts from `{poll_id_param_key: task_id}`, then merges the submit
    /// payload (if inherited), then the static params. Later merges win on
    /// key collisions.
    #[must_use]
    pub fn poll_payload(
        &self,
        task_id: &str,
        submit_payload: &Map<String, Value>,
        static_params: Option<&Map<String, Value>>,
    ) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            self.poll_id_param_key.clone(),
            Value::String(task_id.to_owned()),
        );
        if self.inherit_submit_params {
            payload.extend(submit_payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(extra) = static_params {
            payload.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        payload
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
