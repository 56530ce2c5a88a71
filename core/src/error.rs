//! Error taxonomy for RSVP operations.

use crate::registration::RegistrationStatus;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for RSVP operations.
pub type Result<T> = std::result::Result<T, RsvpError>;

/// Every failure an engine operation can report.
///
/// Domain failures are explicit variants; only unexpected storage failures
/// collapse into [`RsvpError::Infrastructure`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RsvpError {
    // ═══════════════════════════════════════════════════════════
    // Caller-correctable
    // ═══════════════════════════════════════════════════════════

    /// Malformed input.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Input field that failed validation
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// Unknown event, registration, organization or QR hash.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
    },

    /// Caller lacks the membership or role the operation needs.
    #[error("Not authorized: {message}")]
    Authorization {
        /// Reason for the denial (logged, not shown to guests)
        message: String,
    },

    /// A status transition precondition was violated.
    #[error("Registration {}", .current.state_reason())]
    InvalidState {
        /// Status the registration is actually in
        current: RegistrationStatus,
        /// Check-in time, when the registration was checked in
        attended_at: Option<DateTime<Utc>>,
    },

    // ═══════════════════════════════════════════════════════════
    // Transient
    // ═══════════════════════════════════════════════════════════

    /// Retries exhausted (QR-hash collisions or optimistic write conflicts).
    #[error("Conflict: {message}")]
    Conflict {
        /// What conflicted
        message: String,
    },

    /// Storage layer failure (network, timeout, corrupt document).
    #[error("Infrastructure error: {message}")]
    Infrastructure {
        /// Underlying error description (not exposed to users)
        message: String,
    },
}

impl RsvpError {
    /// Create a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub const fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an infrastructure error.
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rsvp_core::RsvpError;
    /// assert!(RsvpError::conflict("hash space").is_retryable());
    /// assert!(!RsvpError::not_found("Registration").is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Infrastructure { .. })
    }

    /// Returns `true` if this error is due to the caller's input or permissions.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::NotFound { .. }
                | Self::Authorization { .. }
                | Self::InvalidState { .. }
        )
    }
}

impl From<StoreError> for RsvpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => Self::NotFound { entity },
            StoreError::Duplicate { collection, field } => {
                Self::conflict(format!("duplicate {field} in {collection}"))
            }
            StoreError::PreconditionFailed { .. } => Self::conflict("concurrent modification"),
            StoreError::Database(message) | StoreError::Serialization(message) => {
                Self::Infrastructure { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_messages() {
        let checked_in = RsvpError::InvalidState {
            current: RegistrationStatus::CheckedIn,
            attended_at: None,
        };
        assert_eq!(checked_in.to_string(), "Registration already checked-in");

        let cancelled = RsvpError::InvalidState {
            current: RegistrationStatus::Cancelled,
            attended_at: None,
        };
        assert_eq!(cancelled.to_string(), "Registration cancelled");
    }

    #[test]
    fn test_store_errors_map_to_infrastructure() {
        let err: RsvpError = StoreError::Database("connection reset".to_string()).into();
        assert!(matches!(err, RsvpError::Infrastructure { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_user_errors() {
        assert!(RsvpError::validation("guestEmail", "bad").is_user_error());
        assert!(!RsvpError::infrastructure("down").is_user_error());
    }
}
