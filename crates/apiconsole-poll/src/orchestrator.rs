//! The submit/poll state machine.
//!
//! A run goes through these steps:
//!
//! 1. Submit the primary call. A non-2xx status settles the run as `Failed`
//!    with the server's message (`ResponseMetadata.Error.Message`) or
//!    `HTTP Error <status>`.
//! 2. Without a poll spec the run settles as `Succeeded` right away.
//! 3. Extract the task ID from the submit response. A missing ID is fatal.
//! 4. Loop: check the wall-clock budget, check cancellation, wait the poll
//!    interval (cancellable), build the poll payload, send the poll call and
//!    evaluate its status. A poll call still in flight when the budget runs
//!    out is abandoned and the run times out.
//!
//! Poll calls are strictly sequential and there is no retry-count cutoff; an
//! unrecognized status keeps the run polling until the budget runs out.

use apiconsole_client::{ApiResponse, ConsoleClient, Dispatch};
use apiconsole_core::ApiCall;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RunError;
use crate::path::extract_text;
use crate::spec::AsyncPollSpec;
use crate::state::{RunOutcome, RunSnapshot, RunState};

/// Where services put a human-readable error message.
pub const SERVER_MESSAGE_PATH: &str = "ResponseMetadata.Error.Message";

/// Mutable state of one live polling run.
#[derive(Debug)]
struct PollRun {
    task_id: String,
    started: Instant,
    poll_count: u32,
    last_response: ApiResponse,
}

/// Drives calls to a terminal state.
#[derive(Debug)]
pub struct PollOrchestrator<D> {
    client: ConsoleClient<D>,
}

impl<D: Dispatch> PollOrchestrator<D> {
    /// Create an orchestrator that sends calls through `client`.
    pub fn new(client: ConsoleClient<D>) -> Self {
        Self { client }
    }

    /// The client used for submit and poll calls.
    pub fn client(&self) -> &ConsoleClient<D> {
        &self.client
    }

    /// Run `call` to completion.
    ///
    /// `cancel` is owned by this run; a [`ConsoleSession`](crate::ConsoleSession)
    /// keeps the only other handle. Snapshots are sent to `progress` as the run
    /// advances, ending with exactly one terminal snapshot. A closed receiver is
    /// not an error.
    pub async fn run(
        &self,
        call: &ApiCall,
        poll: Option<&AsyncPollSpec>,
        cancel: CancellationToken,
        progress: &UnboundedSender<RunSnapshot>,
    ) -> RunOutcome {
        let started = Instant::now();
        let outcome = self.drive(call, poll, &cancel, progress, started).await;

        let elapsed_ms = elapsed_ms(started);
        info!(
            action = %call.action,
            state = ?outcome.state,
            polls = outcome.poll_count,
            elapsed_ms,
            "Run settled"
        );
        let _ = progress.send(outcome.snapshot(elapsed_ms));
        outcome
    }

    async fn drive(
        &self,
        call: &ApiCall,
        poll: Option<&AsyncPollSpec>,
        cancel: &CancellationToken,
        progress: &UnboundedSender<RunSnapshot>,
        started: Instant,
    ) -> RunOutcome {
        info!(
            action = %call.action,
            version = %call.version,
            asynchronous = poll.is_some(),
            "Submitting call"
        );
        let _ = progress.send(RunSnapshot {
            state: RunState::Submitted,
            polling: true,
            task_id: None,
            poll_count: 0,
            elapsed_ms: 0,
            response: None,
            error: None,
        });

        let response = match self.client.execute(call, cancel).await {
            Ok(response) => response,
            Err(e) => return settle_error(RunError::from_dispatch(&e), None),
        };

        if !response.is_success() {
            let error = http_error(&response);
            return settle_error(error, Some(response));
        }

        let Some(spec) = poll else {
            return RunOutcome {
                state: RunState::Succeeded,
                task_id: None,
                poll_count: 0,
                response: Some(response),
                error: None,
            };
        };

        let Some(task_id) = extract_text(&response.body, &spec.submit_response_id_path) else {
            warn!(path = %spec.submit_response_id_path, "Task ID not found in submit response");
            let error = RunError::Extraction {
                path: spec.submit_response_id_path.clone(),
            };
            return settle_error(error, Some(response));
        };

        info!(task_id = %task_id, "Task submitted, polling for status");
        if let Some(max_retries) = spec.max_retries {
            debug!(max_retries, "maxRetries is not enforced, run is bounded by timeout only");
        }

        let mut run = PollRun {
            task_id,
            started,
            poll_count: 0,
            last_response: response,
        };
        let _ = progress.send(polling_snapshot(&run));

        self.poll_loop(call, spec, cancel, progress, &mut run).await
    }

    async fn poll_loop(
        &self,
        call: &ApiCall,
        spec: &AsyncPollSpec,
        cancel: &CancellationToken,
        progress: &UnboundedSender<RunSnapshot>,
        run: &mut PollRun,
    ) -> RunOutcome {
        let static_params = spec.parsed_static_params();
        let timeout = spec.timeout();
        let interval = spec.poll_interval();
        let deadline = run.started + timeout;

        loop {
            if run.started.elapsed() > timeout {
                warn!(task_id = %run.task_id, polls = run.poll_count, "Polling timed out");
                return settle_run(
                    run,
                    RunState::TimedOut,
                    Some(RunError::Timeout {
                        seconds: spec.timeout_seconds,
                    }),
                );
            }
            if cancel.is_cancelled() {
                return settle_run(run, RunState::Cancelled, Some(RunError::Cancelled));
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(task_id = %run.task_id, "Cancelled while waiting");
                    return settle_run(run, RunState::Cancelled, Some(RunError::Cancelled));
                }
                () = sleep(interval) => {}
            }
            // The timer and the token can fire together; cancellation wins.
            if cancel.is_cancelled() {
                return settle_run(run, RunState::Cancelled, Some(RunError::Cancelled));
            }

            let payload = spec.poll_payload(&run.task_id, &call.payload, static_params.as_ref());
            let poll_call = call.sibling(
                spec.poll_action.as_str(),
                spec.poll_version.as_str(),
                spec.poll_method.as_str(),
                payload,
            );

            run.poll_count += 1;
            debug!(task_id = %run.task_id, poll = run.poll_count, "Polling task status");

            let result = tokio::select! {
                biased;
                result = self.client.execute(&poll_call, cancel) => result,
                () = sleep_until(deadline) => {
                    warn!(task_id = %run.task_id, polls = run.poll_count, "Poll call outlived the timeout");
                    return settle_run(
                        run,
                        RunState::TimedOut,
                        Some(RunError::Timeout {
                            seconds: spec.timeout_seconds,
                        }),
                    );
                }
            };
            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let error = RunError::from_dispatch(&e);
                    let state = if error.is_cancellation() {
                        RunState::Cancelled
                    } else {
                        RunState::Failed
                    };
                    return settle_run(run, state, Some(error));
                }
            };

            if !response.is_success() {
                let error = http_error(&response);
                run.last_response = response;
                return settle_run(run, RunState::Failed, Some(error));
            }

            let status = extract_text(&response.body, &spec.poll_status_path);
            run.last_response = response;

            match status.as_deref() {
                Some(s) if s == spec.poll_success_value => {
                    return settle_run(run, RunState::Succeeded, None);
                }
                Some(s) if spec.poll_failed_value.as_deref() == Some(s) => {
                    let message = spec
                        .poll_error_path
                        .as_deref()
                        .and_then(|path| extract_text(&run.last_response.body, path));
                    let error = RunError::TaskFailed {
                        status: s.to_owned(),
                        message,
                    };
                    return settle_run(run, RunState::Failed, Some(error));
                }
                other => {
                    debug!(
                        task_id = %run.task_id,
                        status = other.unwrap_or("<missing>"),
                        "Task still running"
                    );
                    let _ = progress.send(polling_snapshot(run));
                }
            }
        }
    }
}

/// Build the error for a non-2xx response.
fn http_error(response: &ApiResponse) -> RunError {
    let message = extract_text(&response.body, SERVER_MESSAGE_PATH)
        .unwrap_or_else(|| format!("HTTP Error {}", response.status));
    RunError::Http {
        status: response.status,
        message,
    }
}

/// Settle a run that ended before polling started.
fn settle_error(error: RunError, response: Option<ApiResponse>) -> RunOutcome {
    let state = if error.is_cancellation() {
        RunState::Cancelled
    } else {
        RunState::Failed
    };
    RunOutcome {
        state,
        task_id: None,
        poll_count: 0,
        response,
        error: Some(error),
    }
}

fn settle_run(run: &PollRun, state: RunState, error: Option<RunError>) -> RunOutcome {
    RunOutcome {
        state,
        task_id: Some(run.task_id.clone()),
        poll_count: run.poll_count,
        response: Some(run.last_response.clone()),
        error,
    }
}

fn polling_snapshot(run: &PollRun) -> RunSnapshot {
    RunSnapshot {
        state: RunState::Polling,
        polling: true,
        task_id: Some(run.task_id.clone()),
        poll_count: run.poll_count,
        elapsed_ms: elapsed_ms(run.started),
        response: Some(run.last_response.clone()),
        error: None,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
