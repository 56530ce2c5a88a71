//! # RSVP Testing
//!
//! Testing utilities for the RSVP platform.
//!
//! This crate provides:
//! - [`InMemoryDocumentStore`]: a [`DocumentStore`](rsvp_core::DocumentStore)
//!   with the same atomicity guarantees as the Postgres store
//! - [`RecordingDocumentStore`]: counts operations per collection, for asserting
//!   that a code path never touched storage
//! - Deterministic clocks and QR-hash generators
//! - Fixture builders for organizations, events and identities
//!
//! ## Example
//!
//! ```
//! use rsvp_testing::InMemoryDocumentStore;
//! use rsvp_core::{DocumentStore, collections};
//!
//! # async fn example() -> Result<(), rsvp_core::StoreError> {
//! let store = InMemoryDocumentStore::new();
//! store
//!     .create(collections::EVENTS, "E1".into(), serde_json::json!({ "title": "Rust Meetup" }))
//!     .await?;
//! assert_eq!(store.len(collections::EVENTS), 1);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod store_mocks;

use chrono::{DateTime, Duration, Utc};
use rsvp_core::environment::{Clock, QrHashGenerator};
use rsvp_core::QrHash;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, QrHash, QrHashGenerator, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use rsvp_testing::mocks::FixedClock;
    /// use rsvp_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward. Clones share the same time.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable QR hashes: `qr-000001`, `qr-000002`, ...
    #[derive(Debug, Clone, Default)]
    pub struct SequentialQrHashGenerator {
        next: Arc<AtomicU64>,
    }

    impl SequentialQrHashGenerator {
        /// Start at `qr-000001`.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl QrHashGenerator for SequentialQrHashGenerator {
        fn generate(&self) -> QrHash {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            QrHash::new(format!("qr-{n:06}"))
        }
    }

    /// Replays a fixed list of hashes, then falls back to sequential ones.
    ///
    /// Used to force collisions with hashes already in the store.
    #[derive(Debug, Clone)]
    pub struct ScriptedQrHashGenerator {
        script: Arc<Mutex<VecDeque<String>>>,
        fallback: SequentialQrHashGenerator,
    }

    impl ScriptedQrHashGenerator {
        /// Emit `hashes` in order before falling back.
        #[must_use]
        pub fn new<I, S>(hashes: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                script: Arc::new(Mutex::new(hashes.into_iter().map(Into::into).collect())),
                fallback: SequentialQrHashGenerator::new(),
            }
        }

        /// Always emit the same hash.
        #[must_use]
        pub fn repeating(hash: &str, times: usize) -> Self {
            Self::new(std::iter::repeat_n(hash.to_string(), times))
        }
    }

    impl QrHashGenerator for ScriptedQrHashGenerator {
        fn generate(&self) -> QrHash {
            let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
            scripted.map_or_else(|| self.fallback.generate(), QrHash::new)
        }
    }
}

/// Install a `fmt` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ScriptedQrHashGenerator, SequentialQrHashGenerator, test_clock};
pub use store_mocks::{InMemoryDocumentStore, Operation, RecordingDocumentStore};
