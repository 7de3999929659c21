//! Submit-then-poll runs against a mock service.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use apiconsole_poll::{RunError, RunSnapshot, RunState};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{ValidSignature, call, orchestrator, poll_spec};

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(query_param("Action", "Submit"))
            .and(ValidSignature)
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"task_id": "T-42"}})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RunSnapshot>) -> Vec<RunSnapshot> {
        let mut out = Vec::new();
        while let Ok(s) = rx.try_recv() {
            out.push(s);
        }
        out
    }

    #[tokio::test]
    async fn test_should_poll_until_done() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .and(body_partial_json(json!({"task_id": "T-42"})))
            .and(ValidSignature)
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "running"}})))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"status": "done", "image_urls": ["https://cdn.example.com/a.png"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({"req_key": "jimeng", "prompt": "cat"})),
                Some(&poll_spec(20, 10)),
                CancellationToken::new(),
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::Succeeded);
        assert_eq!(outcome.task_id.as_deref(), Some("T-42"));
        assert_eq!(outcome.poll_count, 3);
        let body = outcome.into_result().unwrap().body;
        assert_eq!(body["data"]["image_urls"][0], "https://cdn.example.com/a.png");

        let snapshots = drain(&mut rx);
        assert_eq!(snapshots.iter().filter(|s| !s.polling).count(), 1);
        assert!(!snapshots.last().unwrap().polling);
    }

    #[tokio::test]
    async fn test_should_time_out_when_task_never_settles() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "running"}})))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({})),
                Some(&poll_spec(100, 1)),
                CancellationToken::new(),
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::TimedOut);
        assert_eq!(outcome.error, Some(RunError::Timeout { seconds: 1 }));
        assert!(outcome.poll_count >= 1);
        assert!(outcome.poll_count <= 11);
    }

    #[tokio::test]
    async fn test_should_time_out_while_poll_response_is_delayed() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"status": "done"}}))
                    .set_delay(Duration::from_secs(6)),
            )
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let (tx, _rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({})),
                Some(&poll_spec(10, 1)),
                CancellationToken::new(),
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::TimedOut);
        assert_eq!(outcome.poll_count, 1);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_should_surface_submit_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ResponseMetadata": {"Error": {"Code": "InvalidParameter", "Message": "prompt is required"}}
            })))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({})),
                Some(&poll_spec(20, 5)),
                CancellationToken::new(),
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::Failed);
        assert_eq!(outcome.poll_count, 0);
        assert_eq!(outcome.error.unwrap().to_string(), "prompt is required");
    }

    #[tokio::test]
    async fn test_should_report_task_failure_reason() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"status": "failed", "reason": "risk control"}
            })))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({})),
                Some(&poll_spec(20, 5)),
                CancellationToken::new(),
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::Failed);
        assert_eq!(
            outcome.error,
            Some(RunError::TaskFailed {
                status: "failed".to_owned(),
                message: Some("risk control".to_owned()),
            })
        );
    }

    #[tokio::test]
    async fn test_should_stop_polling_once_cancelled() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("POST"))
            .and(query_param("Action", "GetResult"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"status": "running"}})))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stopper.cancel();
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = orchestrator()
            .run(
                &call(&server.uri(), "Submit", json!({})),
                Some(&poll_spec(100, 30)),
                cancel,
                &tx,
            )
            .await;

        assert_eq!(outcome.state, RunState::Cancelled);
        let polls_at_cancel = outcome.poll_count;
        assert!(polls_at_cancel <= 3);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let received = server.received_requests().await.unwrap();
        let polls_seen = received
            .iter()
            .filter(|r| r.url.query().is_some_and(|q| q.contains("Action=GetResult")))
            .count();
        assert_eq!(u32::try_from(polls_seen).unwrap(), polls_at_cancel);

        let last = drain(&mut rx).pop().unwrap();
        assert_eq!(last.state, RunState::Cancelled);
        assert!(last.error.is_none());
    }
}
