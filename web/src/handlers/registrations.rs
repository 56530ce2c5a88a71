//! Registration endpoints: create, cancel and list.

use crate::error::AppError;
use crate::extractors::{Caller, MaybeCaller};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rsvp_core::{EventId, Registration, RegistrationId, RegistrationStatus};
use rsvp_engine::{CancelAuthority, NewRegistration, RegistrationEngine};
use serde::{Deserialize, Serialize};

/// Response to a successful registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRegistration {
    /// The stored registration
    pub registration: Registration,
    /// Encoded QR payload to render as the guest's ticket
    pub qr_payload: String,
    /// Token for the guest's cancellation link
    pub cancellation_token: String,
}

/// `POST /api/events/:event_id/registrations`
///
/// Public: guests register without a session.
///
/// # Errors
///
/// 422 for invalid guest fields or a closed event, 404 for an unknown event.
#[tracing::instrument(skip(state, input), fields(event_id = %event_id))]
pub async fn create_registration(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(input): Json<NewRegistration>,
) -> Result<(StatusCode, Json<CreatedRegistration>), AppError> {
    let event_id = EventId::from_string(event_id);
    let registration = state.engine.create(&event_id, input).await?;
    let cancellation_token = state.engine.cancellation_token(&registration)?;
    let qr_payload = RegistrationEngine::qr_payload(&registration).encode();

    Ok((
        StatusCode::CREATED,
        Json(CreatedRegistration {
            registration,
            qr_payload,
            cancellation_token,
        }),
    ))
}

/// Body of a cancellation request.
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// Signed cancellation-link token
    #[serde(default)]
    pub token: Option<String>,
}

/// `POST /api/registrations/:id/cancel`
///
/// Authorized by a bearer credential (organizer or the guest) or, without
/// one, by a signed link token in the body.
///
/// # Errors
///
/// 401 with neither credential, 404 for unknown or unauthorized
/// registrations, 409 if already cancelled.
#[tracing::instrument(skip(state, caller, body), fields(registration_id = %registration_id))]
pub async fn cancel_registration(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
    MaybeCaller(caller): MaybeCaller,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Registration>, AppError> {
    let registration_id = RegistrationId::from_string(registration_id);
    let token = body.and_then(|Json(body)| body.token);

    let authority = match (&caller, &token) {
        (Some(identity), _) => CancelAuthority::Identity(identity),
        (None, Some(token)) => CancelAuthority::SignedLink(token),
        (None, None) => {
            return Err(AppError::unauthorized(
                "A bearer credential or cancellation token is required",
            ));
        }
    };

    let registration = state.engine.cancel(&registration_id, authority).await?;
    Ok(Json(registration))
}

/// Query string of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Only registrations in this status
    pub status: Option<RegistrationStatus>,
}

/// Listing response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationList {
    /// Event the registrations belong to
    pub event_id: EventId,
    /// Registrations, oldest first
    pub registrations: Vec<Registration>,
}

/// `GET /api/events/:event_id/registrations?status=`
///
/// # Errors
///
/// 401 without a session, 404 for unknown events or non-members.
#[tracing::instrument(skip(state, identity, params), fields(event_id = %event_id))]
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(params): Query<ListParams>,
    Caller(identity): Caller,
) -> Result<Json<RegistrationList>, AppError> {
    let event_id = EventId::from_string(event_id);
    let listing = state
        .engine
        .list_by_event(&event_id, params.status, &identity)
        .await?;
    let registrations = listing.collect().await?;

    Ok(Json(RegistrationList {
        event_id: listing.event_id().clone(),
        registrations,
    }))
}
