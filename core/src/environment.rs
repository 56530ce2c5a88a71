//! Environment traits: the non-storage dependencies the engine needs.
//!
//! All external effects are abstracted behind traits and injected, so tests
//! can pin the current time and the generated QR hashes.

use crate::registration::QrHash;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use rsvp_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Number of random bytes behind every QR hash (256 bits).
pub const QR_HASH_BYTES: usize = 32;

/// Source of QR hashes.
///
/// Implementations must be unguessable in production. Uniqueness across
/// registrations is enforced separately by the store.
pub trait QrHashGenerator: Send + Sync {
    /// Produce a fresh hash.
    fn generate(&self) -> QrHash;
}

/// Generates 256-bit random tokens from the OS CSPRNG, base64url encoded
/// without padding (43 characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomQrHashGenerator;

impl QrHashGenerator for RandomQrHashGenerator {
    fn generate(&self) -> QrHash {
        let mut random_bytes = [0u8; QR_HASH_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut random_bytes);
        QrHash::new(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes))
    }
}
