//! Door check-in endpoint.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{Json, extract::State};
use rsvp_core::{QrHash, Registration};
use serde::Deserialize;

/// Body of a check-in request: the scanned QR payload, or a bare hash typed
/// in by hand.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// Encoded QR payload as scanned
    #[serde(default)]
    pub payload: Option<String>,
    /// Bare QR hash
    #[serde(default)]
    pub qr_hash: Option<String>,
}

/// `POST /api/check-in`
///
/// A payload takes precedence over a bare hash when both are sent.
///
/// # Errors
///
/// 401 without a session, 422 for a malformed payload or an empty body,
/// 404 for unknown codes and foreign organizations, 409 for a second scan or
/// a cancelled registration.
#[tracing::instrument(skip_all, fields(user_id = %identity.id))]
pub async fn check_in(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Registration>, AppError> {
    let registration = match (request.payload, request.qr_hash) {
        (Some(payload), _) => state.engine.check_in_payload(&payload, &identity).await?,
        (None, Some(hash)) => state.engine.check_in(&QrHash::new(hash), &identity).await?,
        (None, None) => {
            return Err(AppError::validation(
                "payload",
                "either payload or qrHash is required",
            ));
        }
    };

    tracing::info!(registration_id = %registration.id, "Guest checked in");
    Ok(Json(registration))
}
