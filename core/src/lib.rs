//! # RSVP Core
//!
//! Domain types and dependency traits for the RSVP platform: organizations
//! publish events, guests register, organizers check guests in by scanning
//! the QR payload issued with each registration.
//!
//! This crate performs no I/O. It provides:
//!
//! - **Identity**: authenticated principals and their organization memberships
//! - **Organization**: the owner/admin hierarchy events belong to
//! - **Event**: a shared base plus a closed set of typed variants
//! - **Registration**: the status lifecycle and its transition rules
//! - **Store**: the document-store collaborator, including conditional writes
//! - **Environment**: clock and QR-hash generation, injected for testability
//!
//! ## Registration lifecycle
//!
//! ```text
//!               check-in
//!  confirmed ──────────────▶ checked-in
//!      │                         │
//!      │ cancel                  │ cancel (organizer override)
//!      ▼                         ▼
//!  cancelled ◀───────────────────┘
//! ```
//!
//! Nothing moves back to `confirmed`, and `cancelled` is terminal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod environment;
pub mod error;
pub mod event;
pub mod ids;
pub mod identity;
pub mod organization;
pub mod qr;
pub mod registration;
pub mod store;
pub mod timestamp;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, QrHashGenerator, RandomQrHashGenerator, SystemClock};
pub use error::{Result, RsvpError};
pub use event::{Coordinates, Event, EventKind, EventStatus, Location, NewEvent, Speaker};
pub use ids::{EventId, OrgId, RegistrationId, UserId};
pub use identity::{Identity, Membership, Role};
pub use organization::{NewOrganization, Organization, OrganizationUpdate};
pub use qr::QrPayload;
pub use registration::{
    GuestInfo, QrHash, Registration, RegistrationCommand, RegistrationStatus,
};
pub use store::{
    BoxFuture, Collection, Document, DocumentStore, Patch, Preconditions, Query, StoreError,
    collections,
};
