//! The Event Catalog.

use crate::environment::RsvpEnvironment;
use crate::to_document;
use rsvp_auth::AccessGate;
use rsvp_core::store::collections;
use rsvp_core::{
    Document, Event, EventId, EventStatus, Identity, NewEvent, OrgId, Organization, Preconditions,
    Result, Role, RsvpError, StoreError, timestamp,
};
use serde_json::json;

/// Reads and manages events.
#[derive(Debug, Clone)]
pub struct EventCatalog {
    env: RsvpEnvironment,
}

impl EventCatalog {
    /// Create a catalog over `env`.
    #[must_use]
    pub const fn new(env: RsvpEnvironment) -> Self {
        Self { env }
    }

    /// Load an event as stored, without org-name correction.
    pub(crate) async fn load(&self, event_id: &EventId) -> Result<(Event, Document)> {
        let doc = self
            .env
            .store
            .get(collections::EVENTS, event_id.as_str().to_string())
            .await?
            .ok_or(RsvpError::not_found("Event"))?;
        let event: Event = doc.decode()?;
        Ok((event, doc))
    }

    /// Fetch an event.
    ///
    /// If the owning organization has been renamed since the event was
    /// written, the returned event carries the current name and the stored
    /// copy is corrected in the background of this call (best effort).
    ///
    /// # Errors
    ///
    /// - [`RsvpError::NotFound`] if the event does not exist
    /// - [`RsvpError::Infrastructure`] on storage failure
    #[tracing::instrument(skip(self), fields(event_id = %event_id))]
    pub async fn get_by_id(&self, event_id: &EventId) -> Result<Event> {
        let (mut event, doc) = self.load(event_id).await?;

        let org = self
            .env
            .store
            .get(collections::ORGANIZATIONS, event.org_id.as_str().to_string())
            .await?;
        let Some(org) = org else {
            tracing::warn!(org_id = %event.org_id, "Event refers to a missing organization");
            return Ok(event);
        };
        let org: Organization = org.decode()?;

        if org.name != event.org_name {
            event.org_name.clone_from(&org.name);
            let write_back = self
                .env
                .store
                .update(
                    collections::EVENTS,
                    doc.id.clone(),
                    json!({ "orgName": org.name }),
                    Preconditions::new().version(doc.version),
                )
                .await;
            match write_back {
                Ok(_) => tracing::debug!("Corrected denormalized organization name"),
                Err(e) => tracing::debug!(error = %e, "Skipped organization name correction"),
            }
        }

        Ok(event)
    }

    /// Returns `true` if the event exists and is owned by `org_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Infrastructure`] on storage failure.
    pub async fn belongs_to_org(&self, event_id: &EventId, org_id: &OrgId) -> Result<bool> {
        match self.load(event_id).await {
            Ok((event, _)) => Ok(&event.org_id == org_id),
            Err(RsvpError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create an event in an organization the caller administers.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Authorization`] unless the caller is an admin of the org
    /// - [`RsvpError::Validation`] for invalid event fields
    /// - [`RsvpError::NotFound`] if the organization does not exist
    #[tracing::instrument(skip(self, caller, new_event), fields(user_id = %caller.id, org_id = %new_event.org_id))]
    pub async fn create_event(&self, caller: &Identity, new_event: NewEvent) -> Result<Event> {
        AccessGate::require(caller, &new_event.org_id, Some(Role::Admin))?;
        new_event.validate()?;

        let org: Organization = self
            .env
            .store
            .get(collections::ORGANIZATIONS, new_event.org_id.as_str().to_string())
            .await?
            .ok_or(RsvpError::not_found("Organization"))?
            .decode()?;

        let event = new_event.into_event(EventId::new(), org.name, self.env.now())?;
        self.env
            .store
            .create(collections::EVENTS, event.id.as_str().to_string(), to_document(&event)?)
            .await?;

        tracing::info!(event_id = %event.id, event_type = event.kind.type_name(), "Event created");
        Ok(event)
    }

    /// Cancel an event. Registrations against it are rejected afterwards.
    ///
    /// Cancelling an already cancelled event returns it unchanged.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::NotFound`] if the event does not exist
    /// - [`RsvpError::Authorization`] unless the caller is an admin of its org
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.id, event_id = %event_id))]
    pub async fn cancel_event(&self, caller: &Identity, event_id: &EventId) -> Result<Event> {
        let (event, doc) = self.load(event_id).await?;
        AccessGate::require(caller, &event.org_id, Some(Role::Admin))?;
        if event.status == EventStatus::Cancelled {
            return Ok(event);
        }

        let now = self.env.now();
        let result = self
            .env
            .store
            .update(
                collections::EVENTS,
                doc.id,
                json!({ "status": EventStatus::Cancelled, "updatedAt": timestamp::to_json(&now) }),
                Preconditions::new().field_eq("status", json!(EventStatus::Scheduled)),
            )
            .await;

        let updated = match result {
            Ok(doc) => doc,
            // Someone else cancelled it first
            Err(StoreError::PreconditionFailed { current }) => *current,
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Event cancelled");
        updated.decode().map_err(Into::into)
    }
}
