//! Signed guest cancellation links.
//!
//! A guest without an account proves they own a registration by presenting
//! a token derived from the registration id and their email:
//!
//! ```text
//! token = base64url(HMAC-SHA256(secret, "<registration id>\n<lowercased email>"))
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rsvp_core::{RegistrationId, Result, RsvpError};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks cancellation-link tokens.
#[derive(Clone)]
pub struct CancellationSigner {
    secret: Vec<u8>,
}

impl fmt::Debug for CancellationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl CancellationSigner {
    /// Create a signer from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] for an empty secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(RsvpError::validation(
                "cancellationSecret",
                "must not be empty",
            ));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self, registration_id: &RegistrationId, guest_email: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| RsvpError::infrastructure(format!("invalid cancellation secret: {e}")))?;
        mac.update(registration_id.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(guest_email.trim().to_lowercase().as_bytes());
        Ok(mac)
    }

    /// Token for the cancellation link of `registration_id`.
    ///
    /// # Errors
    ///
    /// Only fails if the secret is rejected by the MAC.
    pub fn sign(&self, registration_id: &RegistrationId, guest_email: &str) -> Result<String> {
        let mac = self.mac(registration_id, guest_email)?;
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Returns `true` if `token` was issued for this registration and email.
    ///
    /// The comparison is constant-time.
    #[must_use]
    pub fn verify(&self, token: &str, registration_id: &RegistrationId, guest_email: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            return false;
        };
        self.mac(registration_id, guest_email)
            .is_ok_and(|mac| mac.verify_slice(&tag).is_ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> CancellationSigner {
        CancellationSigner::new("test-secret").unwrap()
    }

    #[test]
    fn test_token_verifies_for_same_registration() {
        let id = RegistrationId::from_string("R1");
        let token = signer().sign(&id, "ana@x.com").unwrap();
        assert!(signer().verify(&token, &id, "ana@x.com"));
        assert!(signer().verify(&token, &id, " Ana@X.com "));
    }

    #[test]
    fn test_token_is_bound_to_registration_and_email() {
        let id = RegistrationId::from_string("R1");
        let token = signer().sign(&id, "ana@x.com").unwrap();
        assert!(!signer().verify(&token, &RegistrationId::from_string("R2"), "ana@x.com"));
        assert!(!signer().verify(&token, &id, "bob@x.com"));
    }

    #[test]
    fn test_other_secret_rejects() {
        let id = RegistrationId::from_string("R1");
        let token = signer().sign(&id, "ana@x.com").unwrap();
        let other = CancellationSigner::new("other-secret").unwrap();
        assert!(!other.verify(&token, &id, "ana@x.com"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(CancellationSigner::new("").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", signer()).contains("test-secret"));
    }

    proptest! {
        #[test]
        fn prop_garbage_tokens_never_verify(token in ".{0,64}") {
            let id = RegistrationId::from_string("R1");
            let genuine = signer().sign(&id, "ana@x.com").unwrap();
            prop_assume!(token != genuine);
            prop_assert!(!signer().verify(&token, &id, "ana@x.com"));
        }
    }
}
