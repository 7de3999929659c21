//! The request description that gets canonicalized, signed and sent.

use std::collections::BTreeMap;

/// A query parameter value: a single string or a repeated parameter.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// `key=value`.
    One(String),
    /// `key=v1&key=v2...`.
    Many(Vec<String>),
}

impl QueryValue {
    /// All non-empty values of this parameter, in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::One(v) => std::slice::from_ref(v),
            Self::Many(vs) => vs,
        };
        values.iter().map(String::as_str).filter(|v| !v.is_empty())
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        Self::One(v.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        Self::One(v)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(vs: Vec<String>) -> Self {
        Self::Many(vs)
    }
}

/// An outbound HTTP request, fully resolved and immutable once built.
///
/// One instance exists per network call (submit or poll). Both the signer and
/// the dispatcher read from the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescription {
    method: String,
    pathname: String,
    query: BTreeMap<String, QueryValue>,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl RequestDescription {
    /// Start building a request for the given HTTP method.
    pub fn builder(method: impl Into<String>) -> RequestDescriptionBuilder {
        RequestDescriptionBuilder {
            inner: Self {
                method: method.into().to_ascii_uppercase(),
                pathname: "/".to_owned(),
                query: BTreeMap::new(),
                headers: BTreeMap::new(),
                body: Vec::new(),
            },
        }
    }

    /// Upper-cased HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path, `/` when none was given.
    #[must_use]
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Query parameters keyed by name.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, QueryValue> {
        &self.query
    }

    /// Caller-supplied headers, before signing adds its own.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Raw body bytes; empty when there is no body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Query parameters flattened into `(key, value)` pairs, empty values dropped.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .iter()
            .flat_map(|(k, v)| v.values().map(move |value| (k.as_str(), value)))
    }
}

/// Builder for [`RequestDescription`].
#[derive(Debug, Clone)]
pub struct RequestDescriptionBuilder {
    inner: RequestDescription,
}

impl RequestDescriptionBuilder {
    /// Set the request path. An empty path becomes `/`.
    #[must_use]
    pub fn pathname(mut self, pathname: impl Into<String>) -> Self {
        let pathname = pathname.into();
        self.inner.pathname = if pathname.is_empty() {
            "/".to_owned()
        } else {
            pathname
        };
        self
    }

    /// Set a query parameter, replacing any previous value for the key.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.inner.query.insert(key.into(), value.into());
        self
    }

    /// Set a header, replacing any previous value for the exact name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.inner.body = body.into();
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> RequestDescription {
        self.inner
    }
}
