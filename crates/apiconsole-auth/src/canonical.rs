//! Canonical request construction.
//!
//! The canonical request is the byte-exact string both sides hash:
//!
//! ```text
//! HTTPRequestMethod\n
//! Pathname\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Every component is normalized so that the same logical request always
//! produces the same string, regardless of map iteration order or header case.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::request::{QueryValue, RequestDescription};

/// Characters that must be percent-encoded in query keys and values.
///
/// Everything except the unreserved set (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`)
/// is encoded, which includes `*`, `!`, `'`, `(` and `)`.
const UNRESERVED_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers that are never signed.
///
/// They are either set by the transport after signing or rewritten by
/// intermediaries, so including them would break verification.
pub const UNSIGNABLE_HEADERS: [&str; 7] = [
    "authorization",
    "content-type",
    "content-length",
    "user-agent",
    "presigned-expires",
    "expect",
    "x-amzn-trace-id",
];

/// Whether a header (any case) takes part in the signature.
#[must_use]
pub fn is_signable_header(name: &str) -> bool {
    !UNSIGNABLE_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Build the full canonical request for `request` using `headers`.
///
/// `headers` is the header map that will actually be transmitted (including
/// any injected date or token headers), and `payload_hash` is the hex SHA-256
/// of the body that was injected as the content-hash header.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use apiconsole_auth::RequestDescription;
/// use apiconsole_auth::canonical::build_canonical_request;
///
/// let req = RequestDescription::builder("get").query("Action", "List").build();
/// let headers = BTreeMap::from([("X-Date".to_owned(), "20240101T000000Z".to_owned())]);
/// let canonical = build_canonical_request(&req, &headers, "e3b0");
/// assert!(canonical.starts_with("GET\n/\nAction=List\nx-date:20240101T000000Z\n\nx-date\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    request: &RequestDescription,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> String {
    let method = request.method().to_ascii_uppercase();
    let pathname = match request.pathname() {
        "" => "/",
        p => p,
    };
    let canonical_query = build_canonical_query_string(request.query());
    let entries = canonical_header_entries(headers);
    let canonical_headers = build_canonical_headers(&entries);
    let signed_headers = build_signed_headers_string(&entries);

    format!(
        "{method}\n{pathname}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
    )
}

/// Build the canonical query string.
///
/// Keys and values are escaped with [`uri_escape`]. Multi-valued parameters
/// expand into repeated pairs whose values are sorted, pairs are ordered by
/// key, and empty values are dropped.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use apiconsole_auth::QueryValue;
/// use apiconsole_auth::canonical::build_canonical_query_string;
///
/// let query = BTreeMap::from([
///     ("b".to_owned(), QueryValue::from("2")),
///     ("a".to_owned(), QueryValue::from("x y")),
/// ]);
/// assert_eq!(build_canonical_query_string(&query), "a=x%20y&b=2");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &BTreeMap<String, QueryValue>) -> String {
    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        let key = uri_escape(key);
        let mut values: Vec<String> = value.values().map(uri_escape).collect();
        values.sort_unstable();
        pairs.extend(values.into_iter().map(|v| format!("{key}={v}")));
    }
    pairs.join("&")
}

/// Normalize the signable headers into a sorted `name -> value` map.
///
/// Names are lower-cased, values trimmed with inner whitespace runs collapsed,
/// and unsignable headers dropped. Names that collide after lower-casing are
/// joined with commas.
#[must_use]
pub fn canonical_header_entries(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut entries: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if !is_signable_header(name) {
            continue;
        }
        let value = collapse_whitespace(value.trim());
        entries
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    entries
}

/// Render normalized header entries as `name:value` lines.
///
/// The result does NOT include a trailing newline; the canonical request adds
/// the blank line separating headers from the signed-header list.
#[must_use]
pub fn build_canonical_headers(entries: &BTreeMap<String, String>) -> String {
    entries
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render normalized header entries as the `;`-separated signed-header list.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use apiconsole_auth::canonical::{build_signed_headers_string, canonical_header_entries};
///
/// let headers = BTreeMap::from([
///     ("X-Date".to_owned(), "20240101T000000Z".to_owned()),
///     ("Host".to_owned(), "example.com".to_owned()),
///     ("Content-Type".to_owned(), "application/json".to_owned()),
/// ]);
/// let entries = canonical_header_entries(&headers);
/// assert_eq!(build_signed_headers_string(&entries), "host;x-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(entries: &BTreeMap<String, String>) -> String {
    entries.keys().map(String::as_str).collect::<Vec<_>>().join(";")
}

/// Percent-encode a query key or value with the strict unreserved set.
///
/// Input is a `&str`, so it is always valid UTF-8 and encoding cannot fail.
#[must_use]
pub fn uri_escape(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
