//! Core types and configuration for apiconsole.
//!
//! This crate holds the pieces shared by the signing, dispatch and polling
//! crates: the resolved [`ApiCall`] the UI layer hands over, the [`Region`]
//! newtype, environment-driven [`ConsoleConfig`], and the core error type.

mod config;
mod error;
mod types;

pub use config::ConsoleConfig;
pub use error::{ConsoleError, ConsoleResult};
pub use types::{ApiCall, Region};
