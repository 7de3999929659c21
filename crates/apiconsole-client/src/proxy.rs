//! Forwarding-proxy URL rewriting.
//!
//! A forwarding proxy receives the full target URL appended to its own URL,
//! e.g. `https://proxy.example.com/https://open.volcengineapi.com/?Action=...`.

/// Rewrite `target` so it is sent through `proxy`.
///
/// A blank or absent proxy leaves the target unchanged. A `/` separator is
/// inserted unless the proxy already ends with `/`, `?` or `=`.
///
/// # Examples
///
/// ```
/// use apiconsole_client::forward_url;
///
/// assert_eq!(forward_url(None, "https://api/x"), "https://api/x");
/// assert_eq!(
///     forward_url(Some("https://proxy"), "https://api/x"),
///     "https://proxy/https://api/x"
/// );
/// assert_eq!(
///     forward_url(Some("https://proxy/?url="), "https://api/x"),
///     "https://proxy/?url=https://api/x"
/// );
/// ```
#[must_use]
pub fn forward_url(proxy: Option<&str>, target: &str) -> String {
    match proxy.map(str::trim) {
        None | Some("") => target.to_owned(),
        Some(prefix) if prefix.ends_with(['/', '?', '=']) => format!("{prefix}{target}"),
        Some(prefix) => format!("{prefix}/{target}"),
    }
}
