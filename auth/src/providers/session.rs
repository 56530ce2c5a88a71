//! Document-backed session resolution.

use super::IdentityResolver;
use crate::utils::credential_digest;
use chrono::{DateTime, Utc};
use rsvp_core::store::collections;
use rsvp_core::{BoxFuture, Clock, DocumentStore, Identity, Result, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A session as issued by the external session service.
///
/// Stored in the `sessions` collection under the SHA-256 hex digest of the
/// bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// User the session belongs to
    pub user_id: UserId,
    /// End of validity
    #[serde(with = "rsvp_core::timestamp")]
    pub expires_at: DateTime<Utc>,
}

/// Resolves bearer credentials against the `sessions` and `users` collections.
pub struct SessionIdentityResolver {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl SessionIdentityResolver {
    /// Create a resolver reading from `store`; expiry is judged by `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn resolve_session(&self, credential: &str) -> Result<Option<Identity>> {
        let Some(session_doc) = self
            .store
            .get(collections::SESSIONS, credential_digest(credential))
            .await?
        else {
            tracing::debug!("Unknown session credential");
            return Ok(None);
        };

        let session: SessionRecord = session_doc.decode()?;
        if session.expires_at <= self.clock.now() {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            return Ok(None);
        }

        let Some(user_doc) = self
            .store
            .get(collections::USERS, session.user_id.as_str().to_string())
            .await?
        else {
            tracing::warn!(user_id = %session.user_id, "Session refers to a missing user");
            return Ok(None);
        };

        let identity: Identity = user_doc.decode()?;
        Ok(Some(identity.normalized()))
    }
}

impl IdentityResolver for SessionIdentityResolver {
    fn resolve<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<Option<Identity>>> {
        Box::pin(self.resolve_session(credential))
    }
}
