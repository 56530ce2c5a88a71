//! Identifiers.
//!
//! Document ids are opaque strings. Newly allocated ids are UUID v4 in
//! hyphenated form; ids issued elsewhere (the identity provider's user ids)
//! are accepted as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Allocates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[doc = concat!("Wraps an existing id as a `", stringify!($name), "`")]
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a user (issued by the identity provider)
    UserId
);

string_id!(
    /// Unique identifier for an organization
    OrgId
);

string_id!(
    /// Unique identifier for an event
    EventId
);

string_id!(
    /// Unique identifier for a registration
    RegistrationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(RegistrationId::new(), RegistrationId::new());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = EventId::from_string("E1");
        assert_eq!(serde_json::to_value(&id).ok(), Some(serde_json::json!("E1")));
    }
}
