//! HMAC-SHA256 request signing for apiconsole.
//!
//! This crate implements the client side of a Signature-V4-style scheme: given
//! a [`RequestDescription`] and a set of [`Credentials`], it produces the
//! headers (date, content hash, optional security token and `Authorization`)
//! that the target service verifies.
//!
//! # Overview
//!
//! Signing is a pure, synchronous computation:
//!
//! 1. Inject `X-Date`, `X-Content-Sha256` and (with a session token)
//!    `X-Security-Token` into the header map.
//! 2. Build the canonical request from method, path, query, headers and the
//!    content hash.
//! 3. Build the string to sign from the timestamp, credential scope and the
//!    canonical request hash.
//! 4. Derive a day/region/service scoped key through an HMAC chain and sign.
//!
//! # Usage
//!
//! ```rust
//! use apiconsole_auth::{Credentials, RequestDescription, Signer, SigningContext};
//!
//! let signer = Signer::new(Credentials::new("AKID", "secret"));
//! let request = RequestDescription::builder("POST")
//!     .query("Action", "ListUsers")
//!     .query("Version", "2018-01-01")
//!     .build();
//!
//! let ctx = SigningContext::now("cn-north-1", "iam");
//! let signed = signer.sign_at(&request, &ctx);
//! assert!(signed.authorization.starts_with("HMAC-SHA256 Credential=AKID/"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - Access key material
//! - [`error`] - Credential loading errors
//! - [`request`] - The immutable request description that gets signed
//! - [`signer`] - Signing key derivation and `Authorization` header assembly

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod request;
pub mod signer;

pub use credentials::Credentials;
pub use error::AuthError;
pub use request::{QueryValue, RequestDescription, RequestDescriptionBuilder};
pub use signer::{SignedRequest, Signer, SigningContext, hash_payload};
