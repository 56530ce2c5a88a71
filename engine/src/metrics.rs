//! Registration metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `rsvp_registrations_created_total` - Registrations created
//! - `rsvp_check_ins_total{outcome}` - Check-in attempts by outcome
//!   (`success`, `already_checked_in`, `cancelled`, `not_found`, `denied`)
//! - `rsvp_cancellations_total{by}` - Cancellations by authority
//!   (`organizer`, `guest`, `link`)
//! - `rsvp_qr_hash_collisions_total` - QR hash collisions during `create`

use metrics::describe_counter;
use rsvp_core::{RegistrationStatus, RsvpError};

/// Register metric descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(
        "rsvp_registrations_created_total",
        "Total number of registrations created"
    );
    describe_counter!(
        "rsvp_check_ins_total",
        "Check-in attempts by outcome (success, already_checked_in, cancelled, not_found, denied)"
    );
    describe_counter!(
        "rsvp_cancellations_total",
        "Cancellations by authority (organizer, guest, link)"
    );
    describe_counter!(
        "rsvp_qr_hash_collisions_total",
        "QR hash collisions detected while creating registrations"
    );

    tracing::info!("RSVP metrics registered");
}

/// Record a registration created.
pub fn record_registration_created() {
    metrics::counter!("rsvp_registrations_created_total").increment(1);
}

/// Record the outcome of a check-in attempt.
pub fn record_check_in(result: Result<(), &RsvpError>) {
    let outcome = match result {
        Ok(()) => "success",
        Err(RsvpError::InvalidState {
            current: RegistrationStatus::Cancelled,
            ..
        }) => "cancelled",
        Err(RsvpError::InvalidState { .. }) => "already_checked_in",
        Err(RsvpError::NotFound { .. }) => "not_found",
        Err(RsvpError::Authorization { .. }) => "denied",
        Err(_) => "error",
    };
    metrics::counter!("rsvp_check_ins_total", "outcome" => outcome).increment(1);
}

/// Record a cancellation.
pub fn record_cancellation(by: &'static str) {
    metrics::counter!("rsvp_cancellations_total", "by" => by).increment(1);
}

/// Record a QR hash collision.
pub fn record_qr_hash_collision() {
    metrics::counter!("rsvp_qr_hash_collisions_total").increment(1);
}
