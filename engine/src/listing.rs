//! Paginated registration listing.
//!
//! Pages are fetched lazily with keyset pagination on `(createdAt, id)`, so a
//! listing of any size holds at most one page in memory. Each call to
//! [`RegistrationListing::stream`] restarts from the first registration.

use futures::{Stream, TryStreamExt};
use rsvp_core::store::collections;
use rsvp_core::{DocumentStore, EventId, Query, Registration, RegistrationStatus, Result, RsvpError};
use std::sync::Arc;

/// An authorized, restartable view of one event's registrations.
#[derive(Clone)]
pub struct RegistrationListing {
    store: Arc<dyn DocumentStore>,
    event_id: EventId,
    status: Option<RegistrationStatus>,
    page_size: usize,
}

impl RegistrationListing {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        event_id: EventId,
        status: Option<RegistrationStatus>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            event_id,
            status,
            page_size: page_size.max(1),
        }
    }

    /// The event being listed.
    #[must_use]
    pub const fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// Status filter, if any.
    #[must_use]
    pub const fn status(&self) -> Option<RegistrationStatus> {
        self.status
    }

    fn page_query(&self, cursor: Option<(serde_json::Value, String)>) -> Query {
        let mut query = Query::new().eq("eventId", self.event_id.as_str());
        if let Some(status) = self.status {
            query = query.eq("status", status.as_str());
        }
        query = query.order_by("createdAt").limit(self.page_size);
        match cursor {
            Some((created_at, id)) => query.start_after(created_at, id),
            None => query,
        }
    }

    /// Stream registrations in `(createdAt, id)` order.
    ///
    /// A storage failure ends the stream with an error item.
    pub fn stream(&self) -> impl Stream<Item = Result<Registration>> + Send + '_ {
        async_stream::try_stream! {
            let mut cursor = None;
            loop {
                let query = self.page_query(cursor.take());
                let page = self
                    .store
                    .query(collections::REGISTRATIONS, query)
                    .await
                    .map_err(RsvpError::from)?;
                let full = page.len() >= self.page_size;

                for doc in &page {
                    let registration: Registration = doc.decode().map_err(RsvpError::from)?;
                    yield registration;
                }

                match page.last() {
                    Some(last) if full => {
                        let created_at = last
                            .field("createdAt")
                            .cloned()
                            .unwrap_or(serde_json::Value::Null);
                        cursor = Some((created_at, last.id.clone()));
                    }
                    _ => break,
                }
            }
        }
    }

    /// Fetch every matching registration.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Infrastructure`] if any page fails to load.
    pub async fn collect(&self) -> Result<Vec<Registration>> {
        self.stream().try_collect().await
    }
}

impl std::fmt::Debug for RegistrationListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationListing")
            .field("event_id", &self.event_id)
            .field("status", &self.status)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use futures::StreamExt;
    use rsvp_core::{Clock, GuestInfo, OrgId, QrHash, RegistrationId};
    use rsvp_testing::fixtures::seed;
    use rsvp_testing::{InMemoryDocumentStore, Operation, RecordingDocumentStore, test_clock};

    async fn seed_registrations(store: &InMemoryDocumentStore, count: usize) {
        let start = test_clock().now();
        for i in 0..count {
            let guest = GuestInfo::new("Guest One", &format!("g{i}@x.com"), None).unwrap();
            let mut registration = Registration::new(
                RegistrationId::from_string(format!("R{i:03}")),
                EventId::from_string("E1"),
                OrgId::from_string("O1"),
                guest,
                None,
                QrHash::new(format!("qr-{i}")),
                start + Duration::seconds(i64::try_from(i / 2).unwrap()),
            );
            if i % 3 == 0 {
                registration.apply_cancel(start).unwrap();
            }
            seed(store, collections::REGISTRATIONS, registration.id.as_str(), &registration)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_pages_cover_every_registration_in_order() {
        let store = InMemoryDocumentStore::new();
        seed_registrations(&store, 7).await;
        let recording = RecordingDocumentStore::new(store);
        let listing = RegistrationListing::new(
            Arc::new(recording.clone()),
            EventId::from_string("E1"),
            None,
            3,
        );

        let ids: Vec<String> = listing
            .collect()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.as_str().to_string())
            .collect();
        assert_eq!(ids, ["R000", "R001", "R002", "R003", "R004", "R005", "R006"]);
        // 3 + 3 + 1
        assert_eq!(recording.count(collections::REGISTRATIONS, Operation::Query), 3);
    }

    #[tokio::test]
    async fn test_stream_restarts_from_the_beginning() {
        let store = InMemoryDocumentStore::new();
        seed_registrations(&store, 5).await;
        let listing =
            RegistrationListing::new(Arc::new(store), EventId::from_string("E1"), None, 2);

        let first: Vec<_> = listing.stream().take(3).collect().await;
        assert_eq!(first.len(), 3);
        assert_eq!(listing.collect().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let store = InMemoryDocumentStore::new();
        seed_registrations(&store, 7).await;
        let listing = RegistrationListing::new(
            Arc::new(store),
            EventId::from_string("E1"),
            Some(RegistrationStatus::Cancelled),
            2,
        );

        let cancelled = listing.collect().await.unwrap();
        let ids: Vec<_> = cancelled.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["R000", "R003", "R006"]);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_infrastructure() {
        let store = InMemoryDocumentStore::new();
        seed_registrations(&store, 3).await;
        store.set_unavailable(true);
        let listing =
            RegistrationListing::new(Arc::new(store), EventId::from_string("E1"), None, 2);

        let err = listing.collect().await.unwrap_err();
        assert!(matches!(err, RsvpError::Infrastructure { .. }));
    }
}
