//! Route table.

use crate::handlers;
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// ```text
/// GET  /health
/// GET  /ready
/// POST /api/events/:event_id/registrations
/// GET  /api/events/:event_id/registrations?status=
/// POST /api/check-in
/// POST /api/registrations/:id/cancel
/// ```
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/events/:event_id/registrations",
            post(handlers::create_registration).get(handlers::list_registrations),
        )
        .route("/check-in", post(handlers::check_in))
        .route("/registrations/:id/cancel", post(handlers::cancel_registration));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
