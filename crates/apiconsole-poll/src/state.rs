//! Run states, progress snapshots and outcomes.

use apiconsole_client::ApiResponse;

use crate::error::RunError;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    /// Nothing sent yet.
    Idle,
    /// The submit call is in flight.
    Submitted,
    /// Waiting for an asynchronous task to settle.
    Polling,
    /// Settled successfully.
    Succeeded,
    /// Settled with an error.
    Failed,
    /// The wall-clock budget ran out.
    TimedOut,
    /// Stopped by the caller.
    Cancelled,
}

impl RunState {
    /// Whether no further transition can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

/// A progress report sent to the UI layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    /// Current state.
    pub state: RunState,
    /// `true` until the run settles, `false` on the terminal snapshot.
    ///
    /// The submit snapshot of a synchronous call is unsettled too, so this
    /// reads as "not settled yet" rather than "a poll call is pending".
    pub polling: bool,
    /// Task ID once extracted.
    pub task_id: Option<String>,
    /// Poll calls issued so far.
    pub poll_count: u32,
    /// Time since submission.
    pub elapsed_ms: u64,
    /// The response this snapshot reports, if any.
    pub response: Option<ApiResponse>,
    /// Error message of a failed run.
    pub error: Option<String>,
}

/// How a run settled.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Terminal state.
    pub state: RunState,
    /// Task ID, for asynchronous runs that got that far.
    pub task_id: Option<String>,
    /// Poll calls issued.
    pub poll_count: u32,
    /// The last response received.
    pub response: Option<ApiResponse>,
    /// Why the run did not succeed.
    pub error: Option<RunError>,
}

impl RunOutcome {
    /// The final response, or the error that ended the run.
    pub fn into_result(self) -> Result<ApiResponse, RunError> {
        match (self.error, self.response) {
            (Some(err), _) => Err(err),
            (None, Some(response)) => Ok(response),
            (None, None) => Err(RunError::Cancelled),
        }
    }

    /// Render as the terminal snapshot.
    #[must_use]
    pub fn snapshot(&self, elapsed_ms: u64) -> RunSnapshot {
        RunSnapshot {
            state: self.state,
            polling: false,
            task_id: self.task_id.clone(),
            poll_count: self.poll_count,
            elapsed_ms,
            response: self.response.clone(),
            error: self
                .error
                .as_ref()
                .filter(|e| !e.is_cancellation())
                .map(ToString::to_string),
        }
    }
}
