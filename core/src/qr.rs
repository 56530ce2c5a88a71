//! QR payload: what the scannable code carries.
//!
//! Only the `qrHash` is a lookup key. `registrationId` and `eventId` are
//! advisory and get cross-checked against the record the hash resolves to.

use crate::error::{Result, RsvpError};
use crate::ids::{EventId, RegistrationId};
use crate::registration::{QrHash, Registration};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest encoded payload accepted by [`QrPayload::decode`].
pub const MAX_ENCODED_LEN: usize = 1024;

/// Contents of a registration's QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QrPayload {
    /// Advisory registration id
    pub registration_id: RegistrationId,
    /// Advisory event id
    pub event_id: EventId,
    /// Trusted lookup token
    pub qr_hash: QrHash,
}

impl QrPayload {
    /// The payload issued for `registration`.
    #[must_use]
    pub fn for_registration(registration: &Registration) -> Self {
        Self {
            registration_id: registration.id.clone(),
            event_id: registration.event_id.clone(),
            qr_hash: registration.qr_hash.clone(),
        }
    }

    /// Compact JSON encoding.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse an encoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] on `payload` for anything that is not
    /// a well-formed payload with non-empty fields.
    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.len() > MAX_ENCODED_LEN {
            return Err(RsvpError::validation("payload", "QR payload too long"));
        }
        let payload: Self = serde_json::from_str(encoded.trim())
            .map_err(|_| RsvpError::validation("payload", "malformed QR payload"))?;
        if payload.registration_id.as_str().is_empty()
            || payload.event_id.as_str().is_empty()
            || payload.qr_hash.as_str().is_empty()
        {
            return Err(RsvpError::validation("payload", "incomplete QR payload"));
        }
        Ok(payload)
    }

    /// Returns `true` if the advisory ids agree with `registration`.
    #[must_use]
    pub fn matches(&self, registration: &Registration) -> bool {
        self.registration_id == registration.id && self.event_id == registration.event_id
    }
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn payload() -> QrPayload {
        QrPayload {
            registration_id: RegistrationId::from_string("R1"),
            event_id: EventId::from_string("E1"),
            qr_hash: QrHash::new("abc"),
        }
    }

    #[test]
    fn test_encoding_is_compact_json() {
        assert_eq!(
            payload().encode(),
            r#"{"registrationId":"R1","eventId":"E1","qrHash":"abc"}"#
        );
    }

    #[test]
    fn test_decode_rejects_missing_and_empty_fields() {
        assert!(QrPayload::decode(r#"{"registrationId":"R1","eventId":"E1"}"#).is_err());
        assert!(QrPayload::decode(r#"{"registrationId":"R1","eventId":"E1","qrHash":""}"#).is_err());
        assert!(QrPayload::decode("not json").is_err());
    }

    #[test]
    fn test_decode_rejects_extra_fields() {
        let err = QrPayload::decode(
            r#"{"registrationId":"R1","eventId":"E1","qrHash":"abc","orgId":"O9"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RsvpError::Validation { ref field, .. } if field == "payload"));
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(input in ".{0,200}") {
            let _ = QrPayload::decode(&input);
        }

        #[test]
        fn prop_decode_inverts_encode(
            reg in "[A-Za-z0-9-]{1,36}",
            event in "[A-Za-z0-9-]{1,36}",
            hash in "[A-Za-z0-9_-]{43}",
        ) {
            let original = QrPayload {
                registration_id: RegistrationId::from_string(reg),
                event_id: EventId::from_string(event),
                qr_hash: QrHash::new(hash),
            };
            prop_assert_eq!(QrPayload::decode(&original.encode()).unwrap(), original);
        }
    }
}
