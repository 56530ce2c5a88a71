//! Registrations and their status lifecycle.
//!
//! The transition rules live in [`RegistrationStatus::transition`], a pure
//! function over `(status, command)`. [`Registration::apply_check_in`] and
//! [`Registration::apply_cancel`] run the rule and stamp the record; they never
//! partially mutate it on failure.

use crate::error::{Result, RsvpError};
use crate::ids::{EventId, OrgId, RegistrationId};
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The secret token bound to a registration and embedded in its QR payload.
///
/// `Debug` is redacted so the hash never ends up in logs by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrHash(String);

impl QrHash {
    /// Wrap a hash value.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Borrow the raw hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QrHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QrHash(<redacted>)")
    }
}

/// Registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationStatus {
    /// Registered, not yet attended
    Confirmed,
    /// Attended; `attended_at` is set
    CheckedIn,
    /// Cancelled by the guest or an organizer (terminal)
    Cancelled,
}

/// Command applied to a registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationCommand {
    /// Mark the guest as attended
    CheckIn,
    /// Cancel the registration
    Cancel,
}

/// A command that has no edge from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {command:?} to a {from} registration")]
pub struct InvalidTransition {
    /// Status the command was applied to
    pub from: RegistrationStatus,
    /// Rejected command
    pub command: RegistrationCommand,
}

impl RegistrationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Confirmed, Self::CheckedIn, Self::Cancelled];

    /// Stored (kebab-case) name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked-in",
            Self::Cancelled => "cancelled",
        }
    }

    /// Short explanation of why a check-in cannot proceed from this status.
    #[must_use]
    pub const fn state_reason(self) -> &'static str {
        match self {
            Self::Confirmed => "not yet checked-in",
            Self::CheckedIn => "already checked-in",
            Self::Cancelled => "cancelled",
        }
    }

    /// The status reached by applying `command`, if the lifecycle allows it.
    ///
    /// Edges: `confirmed → checked-in`, `confirmed → cancelled`,
    /// `checked-in → cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for every other combination.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsvp_core::{RegistrationCommand, RegistrationStatus};
    ///
    /// let next = RegistrationStatus::Confirmed.transition(RegistrationCommand::CheckIn);
    /// assert_eq!(next, Ok(RegistrationStatus::CheckedIn));
    /// assert!(RegistrationStatus::CheckedIn.transition(RegistrationCommand::CheckIn).is_err());
    /// ```
    pub const fn transition(
        self,
        command: RegistrationCommand,
    ) -> std::result::Result<Self, InvalidTransition> {
        match (self, command) {
            (Self::Confirmed, RegistrationCommand::CheckIn) => Ok(Self::CheckedIn),
            (Self::Confirmed | Self::CheckedIn, RegistrationCommand::Cancel) => Ok(Self::Cancelled),
            (from, command) => Err(InvalidTransition { from, command }),
        }
    }

    /// Statuses from which `command` is allowed.
    #[must_use]
    pub fn sources_of(command: RegistrationCommand) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|status| status.transition(command).is_ok())
            .collect()
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = RsvpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "checked-in" => Ok(Self::CheckedIn),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(RsvpError::validation(
                "status",
                format!("unknown registration status '{other}'"),
            )),
        }
    }
}

/// Guest-submitted contact details, normalized and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInfo {
    name: String,
    email: String,
    phone: Option<String>,
}

impl GuestInfo {
    /// Normalize and validate guest input.
    ///
    /// The name is trimmed, the email trimmed and lowercased, and an empty
    /// phone is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] naming the offending field.
    pub fn new(name: &str, email: &str, phone: Option<&str>) -> Result<Self> {
        let name = validation::guest_name(name)?;
        let email = validation::email(email)?;
        let phone = phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(validation::phone)
            .transpose()?;
        Ok(Self { name, email, phone })
    }

    /// Guest name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased guest email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Guest phone, if given.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

/// A guest's registration for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Registration ID
    pub id: RegistrationId,
    /// Event the guest registered for
    pub event_id: EventId,
    /// Copied from the event at creation time
    pub org_id: OrgId,
    /// Guest name
    pub guest_name: String,
    /// Guest email (lowercase)
    pub guest_email: String,
    /// Guest phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_phone: Option<String>,
    /// Current status
    pub status: RegistrationStatus,
    /// Unique lookup token, fixed at creation
    pub qr_hash: QrHash,
    /// Free-form answers to the event's custom questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
    /// Set once, on the first successful check-in
    #[serde(default, with = "crate::timestamp::option")]
    pub attended_at: Option<DateTime<Utc>>,
    /// Creation time
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// A fresh `confirmed` registration.
    #[must_use]
    pub fn new(
        id: RegistrationId,
        event_id: EventId,
        org_id: OrgId,
        guest: GuestInfo,
        custom_data: Option<serde_json::Value>,
        qr_hash: QrHash,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            org_id,
            guest_name: guest.name,
            guest_email: guest.email,
            guest_phone: guest.phone,
            status: RegistrationStatus::Confirmed,
            qr_hash,
            custom_data,
            attended_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The error reported when a command is rejected in the current state.
    #[must_use]
    pub fn invalid_state(&self) -> RsvpError {
        RsvpError::InvalidState {
            current: self.status,
            attended_at: self.attended_at,
        }
    }

    /// Check the guest in at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::InvalidState`] unless the registration is
    /// `confirmed`; the record is left unchanged.
    pub fn apply_check_in(&mut self, now: DateTime<Utc>) -> Result<()> {
        let next = self
            .status
            .transition(RegistrationCommand::CheckIn)
            .map_err(|_| self.invalid_state())?;
        self.status = next;
        self.attended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancel the registration at `now`, keeping `attended_at` and `qr_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::InvalidState`] if already cancelled.
    pub fn apply_cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        let next = self
            .status
            .transition(RegistrationCommand::Cancel)
            .map_err(|_| self.invalid_state())?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
