//! # RSVP Authentication & Authorization
//!
//! Everything between an incoming credential and an engine call:
//!
//! - **Access Gate**: "does this identity hold (at least) this role in this
//!   organization?" Pure, and consulted before any registration data is read.
//! - **Identity resolution**: turns a bearer credential into an [`Identity`]
//!   by reading externally issued sessions. Session issuance lives elsewhere.
//! - **Cancellation links**: HMAC-signed tokens that let a guest cancel their
//!   own registration without an account.
//!
//! ## Flow
//!
//! ```text
//! Bearer token ─▶ IdentityResolver ─▶ Identity ─▶ AccessGate ─▶ engine operation
//!                        │
//!                        └─ sessions / users documents
//! ```
//!
//! [`Identity`]: rsvp_core::Identity

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod gate;
pub mod providers;
pub mod signing;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use gate::AccessGate;
pub use providers::{IdentityResolver, SessionIdentityResolver};
pub use signing::CancellationSigner;
