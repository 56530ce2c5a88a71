//! Error types for web handlers.
//!
//! [`AppError`] bridges [`RsvpError`] and HTTP responses. Missing events,
//! missing registrations and authorization denials all render the same 404
//! body, so a caller cannot tell "exists but not yours" from "does not exist".

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rsvp_core::{RegistrationStatus, RsvpError};
use serde::Serialize;
use std::fmt;

/// Body shown for both not-found and not-authorized outcomes.
pub const NOT_FOUND_MESSAGE: &str = "Not found or not authorized";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Event>, AppError> {
///     let event = state.engine.catalog().get_by_id(&id).await?;
///     Ok(Json(event))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Offending input field, for validation errors
    field: Option<String>,
    /// Current registration state, for invalid transitions
    registration: Option<RegistrationState>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

/// Registration state echoed back on a rejected transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationState {
    status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    attended_at: Option<String>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            field: None,
            registration: None,
            source: None,
        }
    }

    /// Attach a source error (logged, never sent to the client).
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create the 404 shared by not-found and not-authorized outcomes.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            NOT_FOUND_MESSAGE.to_string(),
            "NOT_FOUND",
        )
    }

    /// Create a 422 Unprocessable Entity error for `field`.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR",
        );
        err.field = Some(field.into());
        err
    }

    /// Create a 409 for a registration that cannot make the requested transition.
    #[must_use]
    pub fn invalid_state(current: RegistrationStatus, attended_at: Option<DateTime<Utc>>) -> Self {
        let code = match current {
            RegistrationStatus::Cancelled => "REGISTRATION_CANCELLED",
            _ => "ALREADY_CHECKED_IN",
        };
        let mut err = Self::new(
            StatusCode::CONFLICT,
            format!("Registration {}", current.state_reason()),
            code,
        );
        err.registration = Some(RegistrationState {
            status: current,
            attended_at: attended_at.map(|t| rsvp_core::timestamp::format(&t)),
        });
        err
    }

    /// Create a 503 telling the client to retry.
    #[must_use]
    pub fn retry(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message.into(), "RETRY")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE",
        )
    }

    /// The HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(flatten)]
    registration: Option<RegistrationState>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            field: self.field,
            registration: self.registration,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RsvpError> for AppError {
    fn from(err: RsvpError) -> Self {
        match err {
            RsvpError::Validation { field, message } => Self::validation(field, message),
            RsvpError::NotFound { entity } => {
                tracing::debug!(entity, "Responding not found");
                Self::not_found()
            }
            RsvpError::Authorization { message } => {
                tracing::debug!(reason = %message, "Responding not found to denied caller");
                Self::not_found()
            }
            RsvpError::InvalidState {
                current,
                attended_at,
            } => Self::invalid_state(current, attended_at),
            RsvpError::Conflict { message } => {
                tracing::warn!(reason = %message, "Retries exhausted");
                Self::retry("Please retry the request")
            }
            RsvpError::Infrastructure { message } => {
                Self::unavailable("Service temporarily unavailable")
                    .with_source(anyhow::anyhow!(message))
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::unavailable("Service temporarily unavailable").with_source(err)
    }
}
