//! # RSVP Engine
//!
//! The operations organizers and guests invoke:
//!
//! - [`RegistrationEngine`]: create, check in, cancel and list registrations
//! - [`EventCatalog`]: read events (with org-name correction) and manage them
//! - [`OrganizationDirectory`]: organizations and their memberships
//!
//! Every operation receives the caller's [`Identity`](rsvp_core::Identity)
//! explicitly and returns a [`rsvp_core::Result`]. All dependencies arrive
//! through [`RsvpEnvironment`].
//!
//! ## Check-in
//!
//! ```text
//! qrHash ──▶ lookup ──▶ AccessGate(orgId) ──▶ UPDATE … WHERE status = 'confirmed'
//!                                                  │
//!                              ┌───────────────────┴──────────────────┐
//!                              ▼                                      ▼
//!                       checked-in (first scan)        InvalidState (replay / lost race)
//! ```

pub mod config;
pub mod environment;
pub mod events;
pub mod listing;
pub mod metrics;
pub mod organizations;
pub mod registrations;

pub use config::EngineConfig;
pub use environment::RsvpEnvironment;
pub use events::EventCatalog;
pub use listing::RegistrationListing;
pub use organizations::OrganizationDirectory;
pub use registrations::{CancelAuthority, NewRegistration, RegistrationEngine};

use rsvp_core::{Result, RsvpError};
use serde::Serialize;

/// Encode a record as a document body.
pub(crate) fn to_document<T: Serialize>(record: &T) -> Result<serde_json::Value> {
    serde_json::to_value(record)
        .map_err(|e| RsvpError::infrastructure(format!("failed to encode document: {e}")))
}
