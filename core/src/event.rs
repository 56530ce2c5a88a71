//! Events: a shared base plus one payload per event type.
//!
//! The type-specific payload is a closed sum type, [`EventKind`], stored
//! internally tagged on `type` alongside the common fields:
//!
//! ```json
//! { "id": "E1", "type": "WORKSHOP", "title": "Intro to Rust",
//!   "mentorName": "Ferris", "syllabus": ["Ownership"], ... }
//! ```

use crate::error::{Result, RsvpError};
use crate::ids::{EventId, OrgId};
use crate::timestamp;
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// Where an event takes place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Venue name
    pub name: String,
    /// Street address
    pub address: String,
    /// External map provider place reference
    #[serde(default)]
    pub place_id: String,
    /// Venue coordinates
    pub coordinates: Coordinates,
}

/// A seminar speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    /// Speaker name
    pub name: String,
    /// Job title or affiliation
    #[serde(default)]
    pub title: String,
    /// Portrait URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Type-specific event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Hands-on session led by a mentor
    #[serde(rename_all = "camelCase")]
    Workshop {
        /// Mentor leading the workshop
        mentor_name: String,
        /// Topics covered, in order
        syllabus: Vec<String>,
        /// Participant cap
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_participants: Option<u32>,
    },
    /// Live music
    #[serde(rename_all = "camelCase")]
    Concert {
        /// Performers, in running order
        lineup: Vec<String>,
        /// Time the gates open (`HH:MM`, venue local time)
        gate_open: String,
    },
    /// Talks by one or more speakers
    #[serde(rename_all = "camelCase")]
    Seminar {
        /// Speakers
        speakers: Vec<Speaker>,
        /// Topics
        #[serde(default)]
        topics: Vec<String>,
    },
    /// Informal gathering
    #[serde(rename_all = "camelCase")]
    Meetup {
        /// Agenda
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agenda: Option<String>,
        /// Participant cap
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_participants: Option<u32>,
    },
}

impl EventKind {
    /// The stored type tag.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Workshop { .. } => "WORKSHOP",
            Self::Concert { .. } => "CONCERT",
            Self::Seminar { .. } => "SEMINAR",
            Self::Meetup { .. } => "MEETUP",
        }
    }

    /// Check the type-specific fields.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] for the first missing or empty field.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Workshop {
                mentor_name,
                syllabus,
                max_participants,
            } => {
                validation::min_chars("mentorName", mentor_name, 1)?;
                non_empty_entries("syllabus", syllabus)?;
                positive("maxParticipants", *max_participants)
            }
            Self::Concert { lineup, gate_open } => {
                non_empty_entries("lineup", lineup)?;
                validation::min_chars("gateOpen", gate_open, 1).map(|_| ())
            }
            Self::Seminar { speakers, .. } => {
                if speakers.is_empty() {
                    return Err(RsvpError::validation("speakers", "at least one speaker is required"));
                }
                speakers
                    .iter()
                    .try_for_each(|s| validation::min_chars("speakers.name", &s.name, 1).map(|_| ()))
            }
            Self::Meetup { max_participants, .. } => positive("maxParticipants", *max_participants),
        }
    }
}

fn non_empty_entries(field: &str, entries: &[String]) -> Result<()> {
    if entries.is_empty() || entries.iter().any(|e| e.trim().is_empty()) {
        return Err(RsvpError::validation(field, "at least one non-empty entry is required"));
    }
    Ok(())
}

fn positive(field: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(0) => Err(RsvpError::validation(field, "must be positive")),
        _ => Ok(()),
    }
}

/// Organizer-controlled event status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Open for registration
    #[default]
    Scheduled,
    /// Called off; no new registrations
    Cancelled,
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Price in minor currency units; absent means free
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<u64>,
    /// Owning organization
    pub org_id: OrgId,
    /// Denormalized organization name, corrected on read
    pub org_name: String,
    /// Venue
    pub location: Location,
    /// Start time
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    /// Banner image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    /// Scheduled or cancelled
    #[serde(default)]
    pub status: EventStatus,
    /// Type tag and type-specific fields
    #[serde(flatten)]
    pub kind: EventKind,
    /// Creation time
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns `true` if guests may still register.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Scheduled
    }
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Title (at least 5 characters)
    pub title: String,
    /// Description
    pub description: String,
    /// Price in minor currency units
    #[serde(default)]
    pub price_cents: Option<u64>,
    /// Owning organization
    pub org_id: OrgId,
    /// Venue
    pub location: Location,
    /// Start time
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    /// Banner image URL
    #[serde(default)]
    pub banner_url: Option<String>,
    /// Type tag and type-specific fields
    #[serde(flatten)]
    pub kind: EventKind,
}

impl NewEvent {
    /// Check the common and type-specific fields.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validation::min_chars("title", &self.title, 5)?;
        validation::min_chars("description", &self.description, 1)?;
        validation::min_chars("location.name", &self.location.name, 1)?;
        validation::min_chars("location.address", &self.location.address, 5)?;
        if let Some(banner) = &self.banner_url {
            validation::http_url("bannerUrl", banner)?;
        }
        self.kind.validate()
    }

    /// Validate and build the stored event.
    ///
    /// # Errors
    ///
    /// See [`NewEvent::validate`].
    pub fn into_event(self, id: EventId, org_name: String, now: DateTime<Utc>) -> Result<Event> {
        self.validate()?;
        Ok(Event {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            price_cents: self.price_cents,
            org_id: self.org_id,
            org_name,
            location: self.location,
            date: self.date,
            banner_url: self.banner_url,
            status: EventStatus::Scheduled,
            kind: self.kind,
            created_at: now,
            updated_at: now,
        })
    }
}
