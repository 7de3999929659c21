//! Signing and dispatch of single calls.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use apiconsole_client::DispatchError;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{
        body_json, header, header_exists, method, path, path_regex, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{ValidSignature, call, console_client};

    #[tokio::test]
    async fn test_should_send_verifiable_signed_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param("Action", "ListUsers"))
            .and(query_param("Version", "2022-08-31"))
            .and(header("content-type", "application/json"))
            .and(header_exists("x-date"))
            .and(header_exists("x-content-sha256"))
            .and(body_json(json!({"Limit": 10, "Query": "a b"})))
            .and(ValidSignature)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Result": {"Total": 0}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = console_client(None);
        let response = client
            .execute(
                &call(&server.uri(), "ListUsers", json!({"Limit": 10, "Query": "a b"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.body["Result"]["Total"], 0);
    }

    #[tokio::test]
    async fn test_should_flatten_get_payload_into_signed_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("Action", "ListUsers"))
            .and(query_param("UserName", "hello world*"))
            .and(query_param("Limit", "5"))
            .and(ValidSignature)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut get = call(
            &server.uri(),
            "ListUsers",
            json!({"UserName": "hello world*", "Limit": 5}),
        );
        get.method = "GET".to_owned();

        let response = console_client(None)
            .execute(&get, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_should_return_error_responses_without_raising() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ResponseMetadata": {"Error": {"Code": "InvalidAccessKey", "Message": "denied"}}
            })))
            .mount(&server)
            .await;

        let response = console_client(None)
            .execute(&call(&server.uri(), "ListUsers", json!({})), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 403);
        assert!(!response.is_success());
        assert_eq!(response.status_text, "Forbidden");
    }

    #[tokio::test]
    async fn test_should_route_through_forwarding_proxy() {
        let proxy = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/https:/+open\.volcengineapi\.com/?$"))
            .and(query_param("Action", "ListUsers"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"proxied": true})))
            .expect(1)
            .mount(&proxy)
            .await;

        let client = console_client(Some(proxy.uri()));
        let response = client
            .execute(
                &call("https://open.volcengineapi.com", "ListUsers", json!({})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.body["proxied"], true);
    }

    #[tokio::test]
    async fn test_should_abort_in_flight_call_on_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        });

        let started = std::time::Instant::now();
        let err = console_client(None)
            .execute(&call(&server.uri(), "Slow", json!({})), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(err, DispatchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_should_report_non_json_body_as_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = console_client(None)
            .execute(&call(&server.uri(), "ListUsers", json!({})), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Decode { status: 502, .. }));
    }
}
