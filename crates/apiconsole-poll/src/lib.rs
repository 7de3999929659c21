//! Submit-then-poll orchestration for asynchronous calls.
//!
//! Some services complete work asynchronously: the submit call returns a task
//! identifier and a second action reports the task status. The
//! [`PollOrchestrator`] drives that workflow as a state machine:
//!
//! ```text
//! Idle -> Submitted -> Polling -> { Succeeded | Failed | TimedOut | Cancelled }
//! ```
//!
//! Poll calls are strictly sequential, every 2xx poll response is reported as
//! a [`RunSnapshot`], and exactly one terminal snapshot closes each run.
//! Cancellation is cooperative through a `CancellationToken`; a
//! [`ConsoleSession`] guarantees that at most one run is live at a time.
//!
//! # Modules
//!
//! - [`error`] - Run failure taxonomy
//! - [`orchestrator`] - The submit/poll state machine
//! - [`path`] - Dot-separated field extraction from JSON responses
//! - [`session`] - Ownership of the single active run
//! - [`spec`] - Asynchronous polling configuration
//! - [`state`] - Run states, snapshots and outcomes

pub mod error;
pub mod orchestrator;
pub mod path;
pub mod session;
pub mod spec;
pub mod state;

pub use error::RunError;
pub use orchestrator::PollOrchestrator;
pub use path::{extract_path, extract_text};
pub use session::ConsoleSession;
pub use spec::AsyncPollSpec;
pub use state::{RunOutcome, RunSnapshot, RunState};
