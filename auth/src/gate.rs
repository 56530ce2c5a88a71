//! The Access Gate.

use rsvp_core::{Identity, OrgId, Result, Role, RsvpError};

/// Organization-membership authorization.
///
/// Callers gate on the organization *before* reading any registration
/// records, so a denied caller learns nothing about what exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Returns `true` if `identity` is a member of `org_id` and, when
    /// `required_role` is given, its role meets it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rsvp_auth::AccessGate;
    /// use rsvp_core::{Identity, OrgId, Role, UserId};
    ///
    /// let org = OrgId::from_string("O1");
    /// let member = Identity::new(UserId::from_string("u1")).with_membership(org.clone(), Role::Member);
    ///
    /// assert!(AccessGate::authorize(&member, &org, None));
    /// assert!(AccessGate::authorize(&member, &org, Some(Role::Member)));
    /// assert!(!AccessGate::authorize(&member, &org, Some(Role::Admin)));
    /// assert!(!AccessGate::authorize(&member, &OrgId::from_string("O2"), None));
    /// ```
    #[must_use]
    pub fn authorize(identity: &Identity, org_id: &OrgId, required_role: Option<Role>) -> bool {
        identity
            .role_in(org_id)
            .is_some_and(|held| required_role.is_none_or(|required| held.satisfies(required)))
    }

    /// Like [`authorize`](Self::authorize), as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Authorization`] when the check fails. Denials are
    /// logged at `warn`.
    pub fn require(identity: &Identity, org_id: &OrgId, required_role: Option<Role>) -> Result<()> {
        if Self::authorize(identity, org_id, required_role) {
            return Ok(());
        }

        let required = required_role.map_or("membership", Role::as_str);
        tracing::warn!(
            user_id = %identity.id,
            org_id = %org_id,
            required,
            "Access denied"
        );
        Err(RsvpError::authorization(format!(
            "user {} lacks {required} in organization {org_id}",
            identity.id
        )))
    }

    /// Fails unless `identity` belongs to at least one organization.
    ///
    /// Lets operations that only learn the organization from stored data
    /// reject outsiders without touching storage.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Authorization`] for identities with no memberships.
    pub fn require_any_membership(identity: &Identity) -> Result<()> {
        if identity.has_no_memberships() {
            tracing::warn!(user_id = %identity.id, "Access denied: no memberships");
            return Err(RsvpError::authorization(format!(
                "user {} belongs to no organization",
                identity.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_core::UserId;

    fn identity(memberships: &[(&str, Role)]) -> Identity {
        memberships.iter().fold(Identity::new(UserId::from_string("u1")), |id, (org, role)| {
            id.with_membership(OrgId::from_string(*org), *role)
        })
    }

    #[test]
    fn test_admin_satisfies_every_requirement() {
        let org = OrgId::from_string("O1");
        let admin = identity(&[("O1", Role::Admin)]);
        assert!(AccessGate::authorize(&admin, &org, None));
        assert!(AccessGate::authorize(&admin, &org, Some(Role::Member)));
        assert!(AccessGate::authorize(&admin, &org, Some(Role::Admin)));
    }

    #[test]
    fn test_membership_elsewhere_does_not_count() {
        let outsider = identity(&[("O2", Role::Admin)]);
        let err = AccessGate::require(&outsider, &OrgId::from_string("O1"), None);
        assert!(matches!(err, Err(RsvpError::Authorization { .. })));
    }

    #[test]
    fn test_require_any_membership() {
        assert!(AccessGate::require_any_membership(&identity(&[])).is_err());
        assert!(AccessGate::require_any_membership(&identity(&[("O1", Role::Member)])).is_ok());
    }
}
