//! Mapping of a resolved [`ApiCall`] onto an outbound [`RequestDescription`].
//!
//! `Action` and `Version` always travel as query parameters. For methods that
//! carry no body the payload is flattened into the query string; otherwise it
//! becomes the JSON body. An empty payload produces an empty body, so the
//! content hash of a parameterless `POST` is the hash of the empty string.

use apiconsole_auth::{QueryValue, RequestDescription};
use apiconsole_core::{ApiCall, ConsoleError, ConsoleResult};
use serde_json::Value;

/// Content type sent with JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Build the request description for `call`.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidCall`] if a required field of the call is
/// empty.
pub fn describe_call(call: &ApiCall) -> ConsoleResult<RequestDescription> {
    call.validate()?;

    let method = call.method.trim().to_ascii_uppercase();
    let mut builder = RequestDescription::builder(method.as_str()).pathname(call.pathname.trim());

    for (name, value) in &call.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    if carries_query_payload(&method) {
        for (key, value) in &call.payload {
            if let Some(query) = to_query_value(value) {
                builder = builder.query(key.as_str(), query);
            }
        }
    } else {
        builder = builder.header("Content-Type", JSON_CONTENT_TYPE);
        if !call.payload.is_empty() {
            let body = serde_json::to_vec(&call.payload)
                .map_err(|e| ConsoleError::InvalidCall(format!("payload: {e}")))?;
            builder = builder.body(body);
        }
    }

    // Inserted last so a payload field can never shadow them.
    Ok(builder
        .query("Action", call.action.as_str())
        .query("Version", call.version.as_str())
        .build())
}

/// Methods whose parameters are sent in the query string.
fn carries_query_payload(method: &str) -> bool {
    matches!(method, "GET" | "DELETE" | "HEAD")
}

/// Flatten one payload value into a query value; `null` is dropped.
fn to_query_value(value: &Value) -> Option<QueryValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(QueryValue::One(s.clone())),
        Value::Array(items) => Some(QueryValue::Many(
            items.iter().filter_map(scalar_text).collect(),
        )),
        other => scalar_text(other).map(QueryValue::One),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
