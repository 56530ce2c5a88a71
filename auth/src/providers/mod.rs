//! Identity providers.
//!
//! [`IdentityResolver`] is the seam between the HTTP layer and whatever
//! issues sessions. The web crate depends on the trait; the server wires in
//! [`SessionIdentityResolver`], tests wire in
//! [`MockIdentityResolver`](crate::mocks::MockIdentityResolver).

use rsvp_core::{BoxFuture, Identity, Result};

pub mod session;

pub use session::{SessionIdentityResolver, SessionRecord};

/// Resolves a bearer credential to the identity it was issued for.
///
/// # Dyn Compatibility
///
/// Returns a boxed future so the web layer can hold an
/// `Arc<dyn IdentityResolver>`.
pub trait IdentityResolver: Send + Sync {
    /// Resolve `credential`.
    ///
    /// # Returns
    ///
    /// `None` for unknown or expired credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Infrastructure`](rsvp_core::RsvpError::Infrastructure)
    /// if the backing store is unavailable.
    fn resolve<'a>(&'a self, credential: &'a str) -> BoxFuture<'a, Result<Option<Identity>>>;
}
