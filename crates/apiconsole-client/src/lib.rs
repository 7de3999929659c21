//! Request building and signed HTTP dispatch for apiconsole.
//!
//! [`ConsoleClient`] turns a resolved [`ApiCall`](apiconsole_core::ApiCall)
//! into a [`RequestDescription`](apiconsole_auth::RequestDescription), signs it,
//! rewrites the URL through an optional forwarding proxy and hands the result
//! to a [`Dispatch`] implementation. Exactly one network call is made per
//! [`ConsoleClient::execute`]; retry policy belongs to the caller.
//!
//! # Modules
//!
//! - [`call`] - Mapping of an `ApiCall` onto query parameters and body
//! - [`client`] - Sign-then-dispatch client
//! - [`dispatcher`] - The [`Dispatch`] seam and its reqwest implementation
//! - [`error`] - Dispatch error types
//! - [`proxy`] - Forwarding-proxy URL rewriting

pub mod call;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod proxy;

pub use call::describe_call;
pub use client::ConsoleClient;
pub use dispatcher::{ApiResponse, Dispatch, OutboundRequest, ReqwestDispatcher};
pub use error::DispatchError;
pub use proxy::forward_url;
