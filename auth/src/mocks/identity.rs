//! Mock identity resolver for testing.

use crate::providers::IdentityResolver;
use rsvp_core::{BoxFuture, Identity, Result, RsvpError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock identity resolver.
///
/// Maps bearer tokens straight to identities.
///
/// # Example
///
/// ```
/// use rsvp_auth::mocks::MockIdentityResolver;
/// use rsvp_auth::IdentityResolver;
/// use rsvp_core::{Identity, UserId};
///
/// # async fn example() -> rsvp_core::Result<()> {
/// let resolver = MockIdentityResolver::new();
/// resolver.insert("token-1", Identity::new(UserId::from_string("u1")));
///
/// assert!(resolver.resolve("token-1").await?.is_some());
/// assert!(resolver.resolve("token-2").await?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockIdentityResolver {
    identities: Arc<Mutex<HashMap<String, Identity>>>,
}

impl MockIdentityResolver {
    /// Create a resolver that knows no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `identity` under `token`.
    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        if let Ok(mut identities) = self.identities.lock() {
            identities.insert(token.into(), identity);
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }
}

impl IdentityResolver for MockIdentityResolver {
    fn resolve<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<Option<Identity>>> {
        let result = self
            .identities
            .lock()
            .map(|identities| identities.get(credential).cloned())
            .map_err(|_| RsvpError::infrastructure("Mutex lock failed"));
        Box::pin(async move { result })
    }
}
