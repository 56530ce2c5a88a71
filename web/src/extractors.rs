//! Custom Axum extractors.
//!
//! - [`Caller`]: the identity behind a required bearer credential
//! - [`MaybeCaller`]: the same, for routes where a bearer is one option
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     Caller(identity): Caller,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(user_id = %identity.id, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use rsvp_auth::utils::parse_bearer;
use rsvp_core::Identity;

/// Authenticated caller.
///
/// Rejects with 401 when the `Authorization: Bearer` header is missing,
/// malformed or names an unknown session.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match MaybeCaller::from_request_parts(parts, state).await? {
            MaybeCaller(Some(identity)) => Ok(Self(identity)),
            MaybeCaller(None) => Err(AppError::unauthorized("Missing bearer credential")),
        }
    }
}

/// Caller identity when a bearer credential is present.
///
/// A missing header yields `None`; a present but invalid credential is still
/// rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let credential = header
            .to_str()
            .ok()
            .and_then(parse_bearer)
            .ok_or_else(|| AppError::unauthorized("Malformed Authorization header"))?;

        match state.identities.resolve(credential).await? {
            Some(identity) => Ok(Self(Some(identity))),
            None => {
                tracing::debug!("Rejected unknown bearer credential");
                Err(AppError::unauthorized("Invalid or expired credential"))
            }
        }
    }
}
