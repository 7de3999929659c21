//! End-to-end tests for apiconsole.
//!
//! A `wiremock` server stands in for the cloud API; calls go through the real
//! reqwest dispatcher, so signing, URL building and body transmission are all
//! exercised on the wire.
//!
//! ```text
//! cargo test -p apiconsole-integration
//! ```

use std::sync::Once;

use apiconsole_auth::{Credentials, RequestDescription, Signer, SigningContext};
use apiconsole_client::{ConsoleClient, ReqwestDispatcher};
use apiconsole_core::ApiCall;
use apiconsole_poll::{AsyncPollSpec, PollOrchestrator};
use chrono::NaiveDateTime;
use serde_json::{Value, json};
use wiremock::{Match, Request};

/// Access key used by every test client.
pub const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";

/// Secret used by every test client.
pub const SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn signer() -> Signer {
    Signer::new(Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY))
}

/// Create a client backed by the real HTTP dispatcher.
#[must_use]
pub fn console_client(proxy_url: Option<String>) -> ConsoleClient<ReqwestDispatcher> {
    init_tracing();
    ConsoleClient::new(signer(), ReqwestDispatcher::new(reqwest::Client::new())).with_proxy(proxy_url)
}

/// Create an orchestrator backed by the real HTTP dispatcher.
#[must_use]
pub fn orchestrator() -> PollOrchestrator<ReqwestDispatcher> {
    PollOrchestrator::new(console_client(None))
}

/// A `POST` call against `endpoint`.
#[must_use]
pub fn call(endpoint: &str, action: &str, payload: Value) -> ApiCall {
    serde_json::from_value(json!({
        "endpoint": endpoint,
        "region": "cn-north-1",
        "service": "cv",
        "action": action,
        "version": "2022-08-31",
        "payload": payload,
    }))
    .expect("valid call")
}

/// Poll spec for the `Submit`/`GetResult` pair served by the mocks.
#[must_use]
pub fn poll_spec(interval_ms: u64, timeout_seconds: u64) -> AsyncPollSpec {
    serde_json::from_value(json!({
        "pollAction": "GetResult",
        "pollVersion": "2022-08-31",
        "submitResponseIdPath": "data.task_id",
        "pollIdParamKey": "task_id",
        "pollStatusPath": "data.status",
        "pollSuccessValue": "done",
        "pollFailedValue": "failed",
        "pollErrorPath": "data.reason",
        "pollIntervalMs": interval_ms,
        "timeoutSeconds": timeout_seconds
    }))
    .expect("valid poll spec")
}

/// Matches requests whose `Authorization` header verifies against the test
/// credentials, the way the service would check it.
#[derive(Debug)]
pub struct ValidSignature;

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        verify_signature(request).unwrap_or(false)
    }
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name)?.to_str().ok()
}

fn verify_signature(request: &Request) -> Option<bool> {
    let authorization = header_str(request, "authorization")?;
    let x_date = header_str(request, "x-date")?;

    let scope = authorization.split("Credential=").nth(1)?.split(',').next()?;
    let mut parts = scope.split('/');
    let access_key = parts.next()?;
    let _date = parts.next()?;
    let region = parts.next()?;
    let service = parts.next()?;
    if access_key != ACCESS_KEY_ID {
        return Some(false);
    }
    let signed_headers = authorization
        .split("SignedHeaders=")
        .nth(1)?
        .split(',')
        .next()?;

    let mut builder = RequestDescription::builder(request.method.as_str())
        .pathname(request.url.path())
        .body(request.body.clone());
    for (key, value) in request.url.query_pairs() {
        builder = builder.query(key.into_owned(), value.into_owned());
    }
    for name in signed_headers.split(';') {
        builder = builder.header(name, header_str(request, name)?);
    }

    let at = NaiveDateTime::parse_from_str(x_date, "%Y%m%dT%H%M%SZ")
        .ok()?
        .and_utc();
    let resigned = signer().sign_at(&builder.build(), &SigningContext::new(region, service, at));
    Some(resigned.authorization == authorization)
}

mod test_dispatch;
mod test_poll;
