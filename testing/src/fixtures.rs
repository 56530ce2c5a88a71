//! Fixture builders and seeding helpers.

use chrono::{DateTime, Utc};
use rsvp_core::store::{Collection, Document, DocumentStore, StoreError, collections};
use rsvp_core::{
    Coordinates, Event, EventId, EventKind, EventStatus, Identity, Location, NewEvent, OrgId,
    Organization, Role, UserId,
};
use serde::Serialize;

/// Identity holding the given memberships.
#[must_use]
pub fn identity(user_id: &str, memberships: &[(&str, Role)]) -> Identity {
    memberships.iter().fold(
        Identity::new(UserId::from_string(user_id)),
        |identity, (org_id, role)| identity.with_membership(OrgId::from_string(*org_id), *role),
    )
}

/// Organization record owned by `owner`.
#[must_use]
pub fn organization(id: &str, name: &str, slug: &str, owner: &str, now: DateTime<Utc>) -> Organization {
    Organization {
        id: OrgId::from_string(id),
        name: name.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        logo_url: None,
        owner_id: UserId::from_string(owner),
        created_at: now,
    }
}

/// A valid workshop in `org_id`.
#[must_use]
pub fn new_workshop(org_id: &str, date: DateTime<Utc>) -> NewEvent {
    NewEvent {
        title: "Intro to Rust".to_string(),
        description: "Ownership, borrowing and lifetimes".to_string(),
        price_cents: None,
        org_id: OrgId::from_string(org_id),
        location: Location {
            name: "Hall A".to_string(),
            address: "1 Main Street".to_string(),
            place_id: "place-hall-a".to_string(),
            coordinates: Coordinates {
                lat: -6.2,
                lng: 106.8,
            },
        },
        date,
        banner_url: None,
        kind: EventKind::Workshop {
            mentor_name: "Ferris".to_string(),
            syllabus: vec!["Ownership".to_string(), "Borrowing".to_string()],
            max_participants: Some(30),
        },
    }
}

/// A scheduled workshop record with the given denormalized org name.
#[must_use]
pub fn event(id: &str, org_id: &str, org_name: &str, now: DateTime<Utc>) -> Event {
    let draft = new_workshop(org_id, now);
    Event {
        id: EventId::from_string(id),
        title: draft.title,
        description: draft.description,
        price_cents: draft.price_cents,
        org_id: draft.org_id,
        org_name: org_name.to_string(),
        location: draft.location,
        date: draft.date,
        banner_url: draft.banner_url,
        status: EventStatus::Scheduled,
        kind: draft.kind,
        created_at: now,
        updated_at: now,
    }
}

/// Write `record` into `collection` under `id`.
///
/// # Errors
///
/// Returns the store's error, or `Serialization` if `record` cannot be encoded.
pub async fn seed<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    record: &T,
) -> Result<Document, StoreError> {
    let data =
        serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.create(collection, id.to_string(), data).await
}

/// Seed the user record for `identity`.
///
/// # Errors
///
/// See [`seed`].
pub async fn seed_user(store: &dyn DocumentStore, identity: &Identity) -> Result<Document, StoreError> {
    seed(store, collections::USERS, identity.id.as_str(), identity).await
}

/// Seed an organization and its event in one go.
///
/// # Errors
///
/// See [`seed`].
pub async fn seed_org_with_event(
    store: &dyn DocumentStore,
    org: &Organization,
    event_id: &str,
) -> Result<Event, StoreError> {
    seed(store, collections::ORGANIZATIONS, org.id.as_str(), org).await?;
    let event = event(event_id, org.id.as_str(), &org.name, org.created_at);
    seed(store, collections::EVENTS, event_id, &event).await?;
    Ok(event)
}
