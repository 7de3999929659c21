//! Sign-then-dispatch client.

use apiconsole_auth::canonical::build_canonical_query_string;
use apiconsole_auth::{RequestDescription, SignedRequest, Signer};
use apiconsole_core::ApiCall;
use reqwest::{Method, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::call::describe_call;
use crate::dispatcher::{ApiResponse, Dispatch, OutboundRequest};
use crate::error::DispatchError;
use crate::proxy::forward_url;

/// Builds, signs and sends [`ApiCall`]s.
///
/// Credentials and the proxy prefix are read-only for the lifetime of the
/// client and shared by every call it makes.
#[derive(Debug, Clone)]
pub struct ConsoleClient<D> {
    signer: Signer,
    proxy_url: Option<String>,
    dispatcher: D,
}

impl<D: Dispatch> ConsoleClient<D> {
    /// Create a client that talks to the endpoints directly.
    pub fn new(signer: Signer, dispatcher: D) -> Self {
        Self {
            signer,
            proxy_url: None,
            dispatcher,
        }
    }

    /// Route every request through a forwarding proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url.filter(|p| !p.trim().is_empty());
        self
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Build and sign the request for `call` without sending it.
    pub fn prepare(&self, call: &ApiCall) -> Result<(OutboundRequest, SignedRequest), DispatchError> {
        let description = describe_call(call)?;
        let signed = self
            .signer
            .sign(&description, call.region.as_str(), &call.service);
        let request = self.outbound(call, &description, &signed)?;
        Ok((request, signed))
    }

    /// Send `call` once. Non-2xx responses are returned, not raised.
    pub async fn execute(
        &self,
        call: &ApiCall,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, DispatchError> {
        let (request, _) = self.prepare(call)?;
        debug!(
            action = %call.action,
            version = %call.version,
            method = %request.method,
            "Dispatching call"
        );
        self.dispatcher.dispatch(request, cancel).await
    }

    fn outbound(
        &self,
        call: &ApiCall,
        description: &RequestDescription,
        signed: &SignedRequest,
    ) -> Result<OutboundRequest, DispatchError> {
        let method = Method::from_bytes(description.method().as_bytes())
            .map_err(|_| DispatchError::InvalidMethod(description.method().to_owned()))?;

        let base = format!(
            "{}{}",
            call.endpoint.trim().trim_end_matches('/'),
            description.pathname()
        );
        let mut target = parse_url(&base)?;
        // Form encoding would turn spaces into `+`; send the signed form.
        let query = build_canonical_query_string(description.query());
        if !query.is_empty() {
            target.set_query(Some(&query));
        }
        let url = parse_url(&forward_url(self.proxy_url.as_deref(), target.as_str()))?;

        Ok(OutboundRequest {
            method,
            url,
            headers: signed.headers.clone(),
            body: description.body().to_vec(),
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, DispatchError> {
    Url::parse(raw).map_err(|e| DispatchError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use apiconsole_auth::{Credentials, hash_payload};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingDispatcher {
        seen: Mutex<Vec<OutboundRequest>>,
    }

    #[async_trait]
    impl Dispatch for RecordingDispatcher {
        async fn dispatch(
            &self,
            request: OutboundRequest,
            _cancel: &CancellationToken,
        ) -> Result<ApiResponse, DispatchError> {
            self.seen.lock().unwrap().push(request);
            Ok(ApiResponse::new(200, json!({"ok": true}), std::time::Duration::ZERO))
        }
    }

    fn client() -> ConsoleClient<RecordingDispatcher> {
        ConsoleClient::new(
            Signer::new(Credentials::new("AKID", "secret")),
            RecordingDispatcher::default(),
        )
    }

    fn call(payload: Value) -> ApiCall {
        serde_json::from_value(json!({
            "endpoint": "https://open.volcengineapi.com/",
            "region": "cn-beijing",
            "service": "iam",
            "action": "ListUsers",
            "version": "2018-01-01",
            "payload": payload,
        }))
        .unwrap()
    }

    #[test]
    fn test_should_build_url_with_action_and_version() {
        let (request, signed) = client().prepare(&call(json!({"Limit": 1}))).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.url.as_str(),
            "https://open.volcengineapi.com/?Action=ListUsers&Version=2018-01-01"
        );
        assert_eq!(request.headers, signed.headers);
        assert!(signed.authorization.contains("/cn-beijing/iam/request"));
    }

    #[test]
    fn test_should_send_exactly_the_hashed_body() {
        let (request, signed) = client().prepare(&call(json!({"UserName": "a b"}))).unwrap();
        assert_eq!(signed.headers["X-Content-Sha256"], hash_payload(&request.body));
        assert_eq!(request.body, br#"{"UserName":"a b"}"#.to_vec());
    }

    #[test]
    fn test_should_send_query_exactly_as_signed() {
        let mut c = call(json!({"Filter": "a b*"}));
        c.method = "GET".to_owned();
        let (request, signed) = client().prepare(&c).unwrap();
        assert_eq!(request.url.query(), Some("Action=ListUsers&Filter=a%20b%2A&Version=2018-01-01"));
        assert!(signed.canonical_request.contains("Action=ListUsers&Filter=a%20b%2A&Version=2018-01-01"));
    }

    #[test]
    fn test_should_rewrite_url_through_proxy() {
        let client = client().with_proxy(Some("http://localhost:3000".to_owned()));
        let (request, _) = client.prepare(&call(json!({}))).unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://localhost:3000/https://open.volcengineapi.com/?Action=ListUsers&Version=2018-01-01"
        );
    }

    #[test]
    fn test_should_reject_unparseable_endpoint() {
        let mut c = call(json!({}));
        c.endpoint = "not a url".to_owned();
        assert!(matches!(
            client().prepare(&c),
            Err(DispatchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_dispatch_once_per_execute() {
        let client = client();
        let cancel = CancellationToken::new();
        let response = client.execute(&call(json!({})), &cancel).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(client.dispatcher().seen.lock().unwrap().len(), 1);
    }
}
