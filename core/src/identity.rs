//! Authenticated principals and their organization memberships.

use crate::ids::{OrgId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role an identity holds within one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over the organization, its events and members.
    Admin,
    /// Can check guests in and view registrations.
    Member,
}

impl Role {
    /// Returns `true` if holding `self` meets a `required` role.
    ///
    /// `Admin` satisfies any requirement; `Member` only satisfies `Member`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsvp_core::Role;
    ///
    /// assert!(Role::Admin.satisfies(Role::Member));
    /// assert!(!Role::Member.satisfies(Role::Admin));
    /// ```
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        matches!((self, required), (Self::Admin, _) | (Self::Member, Self::Member))
    }

    /// Lowercase name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identity's role within one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Organization the membership belongs to.
    pub org_id: OrgId,
    /// Role held in that organization.
    pub role: Role,
}

/// An authenticated principal.
///
/// Passed explicitly into every engine operation; nothing reads identity from
/// ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub id: UserId,

    /// Verified email address, if the identity provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// At most one entry per organization.
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

impl Identity {
    /// Create an identity without memberships.
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            display_name: None,
            memberships: Vec::new(),
        }
    }

    /// Builder-style email setter.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder-style membership grant.
    #[must_use]
    pub fn with_membership(mut self, org_id: OrgId, role: Role) -> Self {
        self.grant(org_id, role);
        self
    }

    /// Grant `role` in `org_id`, replacing any existing entry for that org.
    pub fn grant(&mut self, org_id: OrgId, role: Role) {
        if let Some(existing) = self.memberships.iter_mut().find(|m| m.org_id == org_id) {
            existing.role = role;
        } else {
            self.memberships.push(Membership { org_id, role });
        }
    }

    /// The membership entry for `org_id`, if any.
    #[must_use]
    pub fn membership(&self, org_id: &OrgId) -> Option<&Membership> {
        self.memberships.iter().find(|m| &m.org_id == org_id)
    }

    /// Role held in `org_id`, if any.
    #[must_use]
    pub fn role_in(&self, org_id: &OrgId) -> Option<Role> {
        self.membership(org_id).map(|m| m.role)
    }

    /// Returns `true` if the identity belongs to no organization at all.
    #[must_use]
    pub fn has_no_memberships(&self) -> bool {
        self.memberships.is_empty()
    }

    /// Collapse duplicate entries from stored records, keeping the strongest
    /// role per organization and the first-seen order.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut merged: Vec<Membership> = Vec::with_capacity(self.memberships.len());
        for membership in self.memberships.drain(..) {
            match merged.iter_mut().find(|m| m.org_id == membership.org_id) {
                Some(existing) if membership.role.satisfies(existing.role) => {
                    existing.role = membership.role;
                }
                Some(_) => {}
                None => merged.push(membership),
            }
        }
        self.memberships = merged;
        self
    }

    /// Case-insensitive comparison against a guest email.
    ///
    /// Both sides are lowercased the way guest emails are normalized on
    /// registration, so non-ASCII letters compare equal too.
    #[must_use]
    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.trim().to_lowercase() == email.trim().to_lowercase())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_replaces_existing_entry() {
        let org = OrgId::from_string("O1");
        let identity = Identity::new(UserId::from_string("u1"))
            .with_membership(org.clone(), Role::Member)
            .with_membership(org.clone(), Role::Admin);

        assert_eq!(identity.memberships.len(), 1);
        assert_eq!(identity.role_in(&org), Some(Role::Admin));
    }

    #[test]
    fn test_normalized_keeps_strongest_role() {
        let org = OrgId::from_string("O1");
        let mut identity = Identity::new(UserId::from_string("u1"));
        identity.memberships = vec![
            Membership { org_id: org.clone(), role: Role::Member },
            Membership { org_id: OrgId::from_string("O2"), role: Role::Member },
            Membership { org_id: org.clone(), role: Role::Admin },
        ];

        let identity = identity.normalized();
        assert_eq!(identity.memberships.len(), 2);
        assert_eq!(identity.role_in(&org), Some(Role::Admin));
    }

    #[test]
    fn test_role_satisfies() {
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Member));
        assert!(Role::Member.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::Admin));
    }

    #[test]
    fn test_has_email_ignores_case() {
        let identity = Identity::new(UserId::from_string("u1")).with_email("Ana@X.com");
        assert!(identity.has_email("ana@x.com"));
        assert!(!identity.has_email("bob@x.com"));
    }

    #[test]
    fn test_has_email_ignores_non_ascii_case() {
        let identity = Identity::new(UserId::from_string("u1")).with_email(" ÉVA@x.com");
        assert!(identity.has_email("éva@x.com"));
        assert!(!identity.has_email("eva@x.com"));
    }

    #[test]
    fn test_deserializes_stored_user_record() {
        let json = serde_json::json!({
            "id": "u1",
            "email": "ana@x.com",
            "displayName": "Ana",
            "memberships": [{ "orgId": "O1", "role": "admin" }]
        });
        let identity: Identity = serde_json::from_value(json).expect("valid user record");
        assert_eq!(identity.role_in(&OrgId::from_string("O1")), Some(Role::Admin));
    }
}
