//! Ownership of the single active run.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tracks the cancellation handle of the run in flight.
///
/// Starting a run cancels the previous one, so two runs never poll
/// concurrently on behalf of the same console.
#[derive(Debug, Default)]
pub struct ConsoleSession {
    active: Option<CancellationToken>,
}

impl ConsoleSession {
    /// Create a session with no run in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any previous run and hand out the token of a new one.
    pub fn begin_run(&mut self) -> CancellationToken {
        if self.stop() {
            debug!("Superseded the previous run");
        }
        let token = CancellationToken::new();
        self.active = Some(token.clone());
        token
    }

    /// Cancel the run in flight. Returns `false` if there was none.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Whether a run was started and has not been stopped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}
