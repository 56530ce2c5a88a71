//! The Registration Engine.
//!
//! # Concurrency
//!
//! Check-in is a single conditional update guarded by
//! `status == confirmed`: of N concurrent scans of one QR code exactly one
//! update applies, and the rest observe the already checked-in record.
//! Cancellation is a read, a pure transition and a version-guarded write,
//! retried a bounded number of times.

use crate::environment::RsvpEnvironment;
use crate::events::EventCatalog;
use crate::listing::RegistrationListing;
use crate::metrics;
use crate::to_document;
use rsvp_auth::AccessGate;
use rsvp_core::store::collections;
use rsvp_core::{
    Document, EventId, GuestInfo, Identity, Preconditions, QrHash, QrPayload, Query, Registration,
    RegistrationCommand, RegistrationId, RegistrationStatus, Result, RsvpError, StoreError,
    timestamp,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Guest-submitted registration form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    /// Guest name
    pub guest_name: String,
    /// Guest email
    pub guest_email: String,
    /// Guest phone
    #[serde(default)]
    pub guest_phone: Option<String>,
    /// Answers to the event's custom questions (a JSON object)
    #[serde(default)]
    pub custom_data: Option<Value>,
}

/// Who is asking to cancel a registration.
#[derive(Debug, Clone, Copy)]
pub enum CancelAuthority<'a> {
    /// An authenticated caller: an organization member, or the guest by email
    Identity(&'a Identity),
    /// A signed cancellation-link token
    SignedLink(&'a str),
}

/// Creates, checks in, cancels and lists registrations.
#[derive(Debug, Clone)]
pub struct RegistrationEngine {
    env: RsvpEnvironment,
    catalog: EventCatalog,
}

impl RegistrationEngine {
    /// Create an engine over `env`.
    #[must_use]
    pub fn new(env: RsvpEnvironment) -> Self {
        let catalog = EventCatalog::new(env.clone());
        Self { env, catalog }
    }

    /// The event catalog this engine reads events through.
    #[must_use]
    pub const fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// Register a guest for an event.
    ///
    /// The new registration is `confirmed`, carries the event's `orgId` and a
    /// fresh QR hash. A hash that collides with an existing one is replaced,
    /// up to `max_qr_attempts` times.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Validation`] for invalid guest fields, non-object custom
    ///   data, or an event that has been cancelled
    /// - [`RsvpError::NotFound`] if the event does not exist
    /// - [`RsvpError::Conflict`] if every generated hash collided
    #[tracing::instrument(skip(self, input), fields(event_id = %event_id))]
    pub async fn create(&self, event_id: &EventId, input: NewRegistration) -> Result<Registration> {
        let guest = GuestInfo::new(
            &input.guest_name,
            &input.guest_email,
            input.guest_phone.as_deref(),
        )?;
        let custom_data = match input.custom_data {
            None | Some(Value::Null) => None,
            Some(data @ Value::Object(_)) => Some(data),
            Some(_) => {
                return Err(RsvpError::validation("customData", "must be an object"));
            }
        };

        let (event, _) = self.catalog.load(event_id).await?;
        if !event.is_open() {
            return Err(RsvpError::validation("eventId", "event is not open for registration"));
        }

        let attempts = self.env.config.max_qr_attempts.max(1);
        for attempt in 1..=attempts {
            let registration = Registration::new(
                RegistrationId::new(),
                event.id.clone(),
                event.org_id.clone(),
                guest.clone(),
                custom_data.clone(),
                self.env.qr_hashes.generate(),
                self.env.now(),
            );

            let created = self
                .env
                .store
                .create(
                    collections::REGISTRATIONS,
                    registration.id.as_str().to_string(),
                    to_document(&registration)?,
                )
                .await;

            match created {
                Ok(_) => {
                    metrics::record_registration_created();
                    tracing::info!(registration_id = %registration.id, "Registration created");
                    return Ok(registration);
                }
                Err(StoreError::Duplicate { field, .. }) => {
                    if field == "qrHash" {
                        metrics::record_qr_hash_collision();
                    }
                    tracing::warn!(attempt, field = %field, "Registration key collided, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            attempts,
            "QR hash generation exhausted its attempts: token space exhausted or generator defect"
        );
        Err(RsvpError::conflict("could not allocate a unique QR hash"))
    }

    /// The QR payload issued for `registration`.
    #[must_use]
    pub fn qr_payload(registration: &Registration) -> QrPayload {
        QrPayload::for_registration(registration)
    }

    /// Token for `registration`'s cancellation link.
    ///
    /// # Errors
    ///
    /// Only fails if the configured secret is unusable.
    pub fn cancellation_token(&self, registration: &Registration) -> Result<String> {
        self.env
            .signer
            .sign(&registration.id, &registration.guest_email)
    }

    /// Check a guest in by QR hash.
    ///
    /// A second scan of the same code reports
    /// [`RsvpError::InvalidState`] with the original `attended_at`.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Authorization`] if the caller belongs to no organization
    ///   (before any storage access) or not to the registration's organization
    /// - [`RsvpError::NotFound`] for an unknown hash
    /// - [`RsvpError::InvalidState`] if already checked in or cancelled
    #[tracing::instrument(skip(self, qr_hash, caller), fields(user_id = %caller.id))]
    pub async fn check_in(&self, qr_hash: &QrHash, caller: &Identity) -> Result<Registration> {
        let result = self.check_in_by_hash(qr_hash, caller).await;
        metrics::record_check_in(result.as_ref().map(|_| ()));
        result
    }

    async fn check_in_by_hash(&self, qr_hash: &QrHash, caller: &Identity) -> Result<Registration> {
        AccessGate::require_any_membership(caller)?;
        let (registration, _) = self.find_by_hash(qr_hash).await?;
        AccessGate::require(caller, &registration.org_id, None)?;
        self.transition_check_in(registration).await
    }

    /// Check a guest in from a scanned QR payload.
    ///
    /// The caller is authorized against the payload's event before any
    /// registration is read. The lookup then uses only the hash, and the
    /// payload's ids must match the record it finds.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Validation`] for a malformed payload
    /// - [`RsvpError::Authorization`] unless the caller is a member of the
    ///   event's organization
    /// - [`RsvpError::NotFound`] for an unknown event or hash, or a payload
    ///   whose ids do not match the registration
    /// - [`RsvpError::InvalidState`] if already checked in or cancelled
    #[tracing::instrument(skip(self, encoded, caller), fields(user_id = %caller.id))]
    pub async fn check_in_payload(&self, encoded: &str, caller: &Identity) -> Result<Registration> {
        let result = self.check_in_by_payload(encoded, caller).await;
        metrics::record_check_in(result.as_ref().map(|_| ()));
        result
    }

    async fn check_in_by_payload(&self, encoded: &str, caller: &Identity) -> Result<Registration> {
        let payload = QrPayload::decode(encoded)?;
        AccessGate::require_any_membership(caller)?;

        let (event, _) = self.catalog.load(&payload.event_id).await?;
        AccessGate::require(caller, &event.org_id, None)?;

        let (registration, _) = self.find_by_hash(&payload.qr_hash).await?;
        if !payload.matches(&registration) || registration.org_id != event.org_id {
            tracing::warn!(
                registration_id = %registration.id,
                "QR payload ids do not match the registration its hash resolves to"
            );
            return Err(RsvpError::not_found("Registration"));
        }

        self.transition_check_in(registration).await
    }

    async fn find_by_hash(&self, qr_hash: &QrHash) -> Result<(Registration, Document)> {
        let docs = self
            .env
            .store
            .query(
                collections::REGISTRATIONS,
                Query::new().eq("qrHash", qr_hash.as_str()).limit(1),
            )
            .await?;
        let Some(doc) = docs.into_iter().next() else {
            tracing::info!("Unknown QR hash presented");
            return Err(RsvpError::not_found("Registration"));
        };
        let registration: Registration = doc.decode()?;
        Ok((registration, doc))
    }

    /// `confirmed → checked-in` as one conditional write.
    async fn transition_check_in(&self, registration: Registration) -> Result<Registration> {
        let now = self.env.now();
        let mut checked_in = registration.clone();
        checked_in.apply_check_in(now)?;

        let patch = json!({
            "status": RegistrationStatus::CheckedIn,
            "attendedAt": timestamp::to_json(&now),
            "updatedAt": timestamp::to_json(&now),
        });
        let only_if_confirmed =
            Preconditions::new().field_eq("status", json!(RegistrationStatus::Confirmed));

        let result = self
            .env
            .store
            .update(
                collections::REGISTRATIONS,
                registration.id.as_str().to_string(),
                patch,
                only_if_confirmed,
            )
            .await;

        match result {
            Ok(doc) => {
                tracing::info!(registration_id = %registration.id, "Guest checked in");
                doc.decode().map_err(Into::into)
            }
            Err(StoreError::PreconditionFailed { current }) => {
                let current: Registration = current.decode()?;
                tracing::info!(
                    registration_id = %current.id,
                    status = %current.status,
                    "Check-in lost to a concurrent update"
                );
                Err(current.invalid_state())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancel a registration, keeping its QR hash and attendance history.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::NotFound`] for an unknown registration
    /// - [`RsvpError::Authorization`] unless the authority is a member of the
    ///   registration's organization, the guest (by email), or a valid link
    /// - [`RsvpError::InvalidState`] if already cancelled
    /// - [`RsvpError::Conflict`] if concurrent writes exhausted the retries
    #[tracing::instrument(skip(self, authority), fields(registration_id = %registration_id))]
    pub async fn cancel(
        &self,
        registration_id: &RegistrationId,
        authority: CancelAuthority<'_>,
    ) -> Result<Registration> {
        let mut doc = self
            .env
            .store
            .get(collections::REGISTRATIONS, registration_id.as_str().to_string())
            .await?
            .ok_or(RsvpError::not_found("Registration"))?;
        let mut registration: Registration = doc.decode()?;

        // orgId and guestEmail never change, so authorizing once covers every retry
        let by = self.authorize_cancel(&registration, authority)?;

        for attempt in 1..=self.env.config.write_attempts.max(1) {
            let now = self.env.now();
            let mut cancelled = registration.clone();
            cancelled.apply_cancel(now)?;

            let guard = Preconditions::new().version(doc.version).field_one_of(
                "status",
                RegistrationStatus::sources_of(RegistrationCommand::Cancel)
                    .into_iter()
                    .map(|s| json!(s))
                    .collect(),
            );
            let result = self
                .env
                .store
                .update(
                    collections::REGISTRATIONS,
                    doc.id.clone(),
                    json!({
                        "status": RegistrationStatus::Cancelled,
                        "updatedAt": timestamp::to_json(&now),
                    }),
                    guard,
                )
                .await;

            match result {
                Ok(updated) => {
                    metrics::record_cancellation(by);
                    tracing::info!(by, "Registration cancelled");
                    return updated.decode().map_err(Into::into);
                }
                Err(StoreError::PreconditionFailed { current }) => {
                    tracing::debug!(attempt, "Registration changed concurrently, retrying cancel");
                    doc = *current;
                    registration = doc.decode()?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RsvpError::conflict("registration kept changing during cancel"))
    }

    fn authorize_cancel(
        &self,
        registration: &Registration,
        authority: CancelAuthority<'_>,
    ) -> Result<&'static str> {
        match authority {
            CancelAuthority::Identity(caller) => {
                if AccessGate::authorize(caller, &registration.org_id, None) {
                    Ok("organizer")
                } else if caller.has_email(&registration.guest_email) {
                    Ok("guest")
                } else {
                    tracing::warn!(user_id = %caller.id, "Cancel denied");
                    Err(RsvpError::authorization(
                        "not the guest or a member of the organization",
                    ))
                }
            }
            CancelAuthority::SignedLink(token) => {
                if self
                    .env
                    .signer
                    .verify(token, &registration.id, &registration.guest_email)
                {
                    Ok("link")
                } else {
                    tracing::warn!("Cancel denied: invalid link token");
                    Err(RsvpError::authorization("invalid cancellation link"))
                }
            }
        }
    }

    /// Registrations for an event, oldest first, optionally narrowed by status.
    ///
    /// Authorization happens here, before any registration is queried; the
    /// returned listing fetches pages lazily and can be streamed repeatedly.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::NotFound`] if the event does not exist
    /// - [`RsvpError::Authorization`] unless the caller is a member of the
    ///   event's organization
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.id, event_id = %event_id))]
    pub async fn list_by_event(
        &self,
        event_id: &EventId,
        status_filter: Option<RegistrationStatus>,
        caller: &Identity,
    ) -> Result<RegistrationListing> {
        AccessGate::require_any_membership(caller)?;
        let (event, _) = self.catalog.load(event_id).await?;
        AccessGate::require(caller, &event.org_id, None)?;

        Ok(RegistrationListing::new(
            self.env.store.clone(),
            event.id,
            status_filter,
            self.env.config.list_page_size,
        ))
    }
}
