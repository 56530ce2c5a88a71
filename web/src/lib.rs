//! HTTP surface of the RSVP platform.
//!
//! Handlers are thin adapters: extract the caller and input, call the
//! [`RegistrationEngine`](rsvp_engine::RegistrationEngine), and map the
//! result through [`AppError`].
//!
//! # Request Flow
//!
//! 1. The correlation layer tags the request and opens an `http_request` span
//! 2. [`Caller`] resolves the bearer credential through the
//!    [`IdentityResolver`](rsvp_auth::IdentityResolver)
//! 3. The handler invokes one engine operation
//! 4. Errors render as JSON `{ code, message }` with the mapped status
//!
//! # Example
//!
//! ```ignore
//! use rsvp_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(env, identities));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{Caller, MaybeCaller};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
