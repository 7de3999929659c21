//! Dot-separated field extraction from JSON responses.
//!
//! A path such as `Result.data.task_id` indexes into nested objects one
//! segment at a time; a numeric segment indexes into an array. A missing
//! intermediate field short-circuits to "not found".

use serde_json::Value;

/// Look up `path` inside `value`.
///
/// An empty path finds nothing.
///
/// # Examples
///
/// ```
/// use apiconsole_poll::extract_path;
/// use serde_json::json;
///
/// let body = json!({"data": {"task_id": "T1", "items": [{"id": 7}]}});
/// assert_eq!(extract_path(&body, "data.task_id"), Some(&json!("T1")));
/// assert_eq!(extract_path(&body, "data.items.0.id"), Some(&json!(7)));
/// assert_eq!(extract_path(&body, "data.missing"), None);
/// ```
#[must_use]
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    lookup(value, path.split('.'))
}

/// Look up `path` and render the value as text.
///
/// Strings are returned verbatim, numbers and booleans in their JSON form.
/// `null` and empty strings count as not found.
#[must_use]
pub fn extract_text(value: &Value, path: &str) -> Option<String> {
    extract_path(value, path).and_then(value_text)
}

fn lookup<'a, 'p>(value: &'a Value, mut segments: impl Iterator<Item = &'p str>) -> Option<&'a Value> {
    let Some(segment) = segments.next() else {
        return Some(value);
    };
    let child = match value {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
        _ => return None,
    };
    lookup(child, segments)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
