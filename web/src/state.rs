//! Application state for Axum handlers.

use rsvp_auth::IdentityResolver;
use rsvp_core::DocumentStore;
use rsvp_engine::{RegistrationEngine, RsvpEnvironment};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registration operations
    pub engine: RegistrationEngine,
    /// Resolves bearer credentials to identities
    pub identities: Arc<dyn IdentityResolver>,
    /// Store the engine writes to, probed by readiness checks
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Build the state from the engine environment and an identity resolver.
    #[must_use]
    pub fn new(env: RsvpEnvironment, identities: Arc<dyn IdentityResolver>) -> Self {
        let store = env.store.clone();
        Self {
            engine: RegistrationEngine::new(env),
            identities,
            store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
