//! Utility functions for authentication.

use sha2::{Digest, Sha256};

/// SHA-256 digest of a bearer credential, hex encoded.
///
/// Sessions are stored under this digest so the raw credential never reaches
/// storage.
///
/// # Examples
///
/// ```
/// use rsvp_auth::utils::credential_digest;
///
/// let digest = credential_digest("token");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, credential_digest("token"));
/// assert_ne!(digest, credential_digest("other"));
/// ```
#[must_use]
pub fn credential_digest(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

/// Extract the credential from an `Authorization: Bearer <token>` value.
///
/// ```
/// use rsvp_auth::utils::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("Basic abc"), None);
/// assert_eq!(parse_bearer("Bearer "), None);
/// ```
#[must_use]
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
