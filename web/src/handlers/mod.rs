//! HTTP request handlers.

pub mod check_in;
pub mod health;
pub mod registrations;

pub use check_in::check_in;
pub use health::{health_check, readiness_check};
pub use registrations::{cancel_registration, create_registration, list_registrations};
