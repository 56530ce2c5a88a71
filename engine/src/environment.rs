//! Injected dependencies shared by every engine component.

use crate::config::EngineConfig;
use chrono::{DateTime, SubsecRound, Utc};
use rsvp_auth::CancellationSigner;
use rsvp_core::{Clock, DocumentStore, QrHashGenerator};
use std::sync::Arc;

/// Environment for the engine components.
#[derive(Clone)]
pub struct RsvpEnvironment {
    /// Document store
    pub store: Arc<dyn DocumentStore>,
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of QR hashes
    pub qr_hashes: Arc<dyn QrHashGenerator>,
    /// Cancellation-link signer
    pub signer: CancellationSigner,
    /// Tuning knobs
    pub config: EngineConfig,
}

impl RsvpEnvironment {
    /// Creates a new `RsvpEnvironment` with the default configuration
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        qr_hashes: Arc<dyn QrHashGenerator>,
        signer: CancellationSigner,
    ) -> Self {
        Self {
            store,
            clock,
            qr_hashes,
            signer,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Current time at the precision documents store (microseconds).
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }
}

impl std::fmt::Debug for RsvpEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsvpEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
