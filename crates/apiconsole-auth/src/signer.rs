//! Request signing.
//!
//! This module implements the signing flow:
//!
//! 1. Inject the date, content-hash and (optional) security-token headers.
//! 2. Build the canonical request from the request and the augmented headers.
//! 3. Build the string to sign from the timestamp, credential scope and
//!    canonical request hash.
//! 4. Derive the signing key with an HMAC-SHA256 chain over the credential
//!    scope components.
//! 5. Sign the string and assemble the `Authorization` header.
//!
//! The main entry points are [`Signer::sign`] and [`Signer::sign_at`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{
    build_canonical_request, build_signed_headers_string, canonical_header_entries,
};
use crate::credentials::Credentials;
use crate::request::RequestDescription;

/// Algorithm identifier placed in the string to sign and `Authorization`.
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Header carrying the signing timestamp.
pub const DATE_HEADER: &str = "X-Date";

/// Header carrying the session token of temporary credentials.
pub const SECURITY_TOKEN_HEADER: &str = "X-Security-Token";

/// Header carrying the hex SHA-256 of the body.
pub const CONTENT_SHA256_HEADER: &str = "X-Content-Sha256";

/// Header carrying the computed signature.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Terminator of the credential scope.
pub const SCOPE_TERMINATOR: &str = "request";

/// Timestamp format: ISO 8601 basic, second precision, UTC.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Per-signature scope: where and when the request is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// Region component of the credential scope.
    pub region: String,
    /// Service component of the credential scope.
    pub service: String,
    /// `YYYYMMDDTHHMMSSZ`.
    pub timestamp: String,
    /// `YYYYMMDD`, the first eight characters of `timestamp`.
    pub date_stamp: String,
}

impl SigningContext {
    /// Build a context for an explicit instant.
    pub fn new(region: impl Into<String>, service: impl Into<String>, at: DateTime<Utc>) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        let date_stamp = timestamp[..8].to_owned();
        Self {
            region: region.into(),
            service: service.into(),
            timestamp,
            date_stamp,
        }
    }

    /// Build a context for the current wall-clock time.
    pub fn now(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(region, service, Utc::now())
    }

    /// `date/region/service/request`.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date_stamp, self.region, self.service
        )
    }
}

/// The output of signing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Original headers plus the injected ones and `Authorization`.
    pub headers: BTreeMap<String, String>,
    /// The `Authorization` header value.
    pub authorization: String,
    /// `;`-separated list of signed header names.
    pub signed_headers: String,
    /// The canonical request that was hashed.
    pub canonical_request: String,
    /// The string that was signed.
    pub string_to_sign: String,
    /// Hex-encoded signature.
    pub signature: String,
}

/// Signs requests with one set of credentials.
///
/// The signer never validates the credentials; a request signed with an empty
/// secret is still produced and left for the server to reject.
#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
}

impl Signer {
    /// Create a signer for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The credentials this signer uses.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign `request` at the current wall-clock time.
    #[must_use]
    pub fn sign(&self, request: &RequestDescription, region: &str, service: &str) -> SignedRequest {
        self.sign_at(request, &SigningContext::now(region, service))
    }

    /// Sign `request` within an explicit [`SigningContext`].
    #[must_use]
    pub fn sign_at(&self, request: &RequestDescription, ctx: &SigningContext) -> SignedRequest {
        let payload_hash = hash_payload(request.body());

        let mut headers = request.headers().clone();
        set_header(&mut headers, DATE_HEADER, ctx.timestamp.clone());
        set_header(&mut headers, CONTENT_SHA256_HEADER, payload_hash.clone());
        if let Some(token) = &self.credentials.session_token {
            set_header(&mut headers, SECURITY_TOKEN_HEADER, token.clone());
        }

        let canonical_request = build_canonical_request(request, &headers, &payload_hash);
        let signed_headers = build_signed_headers_string(&canonical_header_entries(&headers));
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

        debug!(
            method = request.method(),
            signed_headers = %signed_headers,
            canonical_hash = %canonical_hash,
            "Built canonical request"
        );

        let credential_scope = ctx.credential_scope();
        let string_to_sign = build_string_to_sign(&ctx.timestamp, &credential_scope, &canonical_hash);

        let signing_key = derive_signing_key(
            &self.credentials.secret_access_key,
            &ctx.date_stamp,
            &ctx.region,
            &ctx.service,
        );
        let signature = compute_signature(&signing_key, &string_to_sign);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key_id
        );
        headers.insert(AUTHORIZATION_HEADER.to_owned(), authorization.clone());

        debug!(
            access_key_id = %self.credentials.access_key_id,
            scope = %credential_scope,
            "Signed request"
        );

        SignedRequest {
            headers,
            authorization,
            signed_headers,
            canonical_request,
            string_to_sign,
            signature,
        }
    }
}

/// Build the string to sign.
///
/// Format:
/// ```text
/// HMAC-SHA256\n
/// <timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use apiconsole_auth::signer::build_string_to_sign;
///
/// let sts = build_string_to_sign("20240315T081530Z", "20240315/cn-north-1/iam/request", "abc");
/// assert_eq!(sts, "HMAC-SHA256\n20240315T081530Z\n20240315/cn-north-1/iam/request\nabc");
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the signing key using an HMAC-SHA256 chain.
///
/// ```text
/// kDate      = HMAC-SHA256(secret_key, date)
/// kRegion    = HMAC-SHA256(kDate, region)
/// kService   = HMAC-SHA256(kRegion, service)
/// signingKey = HMAC-SHA256(kService, "request")
/// ```
///
/// Unlike AWS SigV4 the secret is used as-is, without a prefix.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(secret_key.as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use apiconsole_auth::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Insert `name`, replacing any existing header that differs only in case.
fn set_header(headers: &mut BTreeMap<String, String>, name: &str, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value);
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
