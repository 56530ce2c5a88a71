//! The Organization Directory.

use crate::environment::RsvpEnvironment;
use crate::to_document;
use rsvp_auth::AccessGate;
use rsvp_core::store::collections;
use rsvp_core::{
    Identity, NewOrganization, OrgId, Organization, OrganizationUpdate, Preconditions, Query,
    Result, Role, RsvpError, StoreError, UserId,
};
use serde_json::json;

/// Organizations and their memberships.
#[derive(Debug, Clone)]
pub struct OrganizationDirectory {
    env: RsvpEnvironment,
}

impl OrganizationDirectory {
    /// Create a directory over `env`.
    #[must_use]
    pub const fn new(env: RsvpEnvironment) -> Self {
        Self { env }
    }

    /// Create an organization owned by `caller`, who becomes its admin.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Validation`] for invalid fields or a slug already taken
    /// - [`RsvpError::Infrastructure`] or [`RsvpError::Conflict`] if the admin
    ///   grant fails; the organization is removed again
    #[tracing::instrument(skip(self, caller, input), fields(user_id = %caller.id))]
    pub async fn create(&self, caller: &Identity, input: NewOrganization) -> Result<Organization> {
        let org = input.into_organization(OrgId::new(), caller.id.clone(), self.env.now())?;

        let created = self
            .env
            .store
            .create(collections::ORGANIZATIONS, org.id.as_str().to_string(), to_document(&org)?)
            .await;
        match created {
            Ok(_) => {}
            Err(StoreError::Duplicate { field, .. }) if field == "slug" => {
                return Err(RsvpError::validation("slug", "slug already taken"));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self
            .grant_membership(&caller.id, &org.id, Role::Admin, Some(caller))
            .await
        {
            // An organization without its admin is unreachable and holds the slug
            self.roll_back(&org.id, &e).await;
            return Err(e);
        }
        tracing::info!(org_id = %org.id, "Organization created");
        Ok(org)
    }

    async fn roll_back(&self, org_id: &OrgId, cause: &RsvpError) {
        match self
            .env
            .store
            .delete(collections::ORGANIZATIONS, org_id.as_str().to_string())
            .await
        {
            Ok(_) => {
                tracing::warn!(%org_id, error = %cause, "Admin grant failed, organization removed");
            }
            Err(e) => tracing::error!(
                %org_id,
                error = %e,
                cause = %cause,
                "Admin grant failed and the organization could not be removed"
            ),
        }
    }

    /// Fetch an organization.
    ///
    /// # Errors
    ///
    /// [`RsvpError::NotFound`] if it does not exist.
    pub async fn get(&self, org_id: &OrgId) -> Result<Organization> {
        self.env
            .store
            .get(collections::ORGANIZATIONS, org_id.as_str().to_string())
            .await?
            .ok_or(RsvpError::not_found("Organization"))?
            .decode()
            .map_err(Into::into)
    }

    /// Fetch an organization by slug.
    ///
    /// # Errors
    ///
    /// [`RsvpError::NotFound`] if no organization has this slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Organization> {
        let docs = self
            .env
            .store
            .query(
                collections::ORGANIZATIONS,
                Query::new().eq("slug", slug.trim()).limit(1),
            )
            .await?;
        docs.first()
            .ok_or(RsvpError::not_found("Organization"))?
            .decode()
            .map_err(Into::into)
    }

    /// Change an organization's name, description or logo. Admin only.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Authorization`] unless the caller is an admin
    /// - [`RsvpError::Validation`] for invalid fields
    /// - [`RsvpError::NotFound`] if the organization does not exist
    #[tracing::instrument(skip(self, caller, update), fields(user_id = %caller.id, org_id = %org_id))]
    pub async fn update_details(
        &self,
        caller: &Identity,
        org_id: &OrgId,
        update: OrganizationUpdate,
    ) -> Result<Organization> {
        AccessGate::require(caller, org_id, Some(Role::Admin))?;
        let patch = update.to_patch()?;
        if patch.as_object().is_none_or(serde_json::Map::is_empty) {
            return self.get(org_id).await;
        }

        let doc = self
            .env
            .store
            .update(
                collections::ORGANIZATIONS,
                org_id.as_str().to_string(),
                patch,
                Preconditions::new(),
            )
            .await?;
        tracing::info!("Organization details updated");
        doc.decode().map_err(Into::into)
    }

    /// Give `user_id` a role in the organization, replacing any previous one.
    /// Admin only.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Authorization`] unless the caller is an admin
    /// - [`RsvpError::NotFound`] if the organization or user does not exist
    #[tracing::instrument(skip(self, caller), fields(caller_id = %caller.id, org_id = %org_id, user_id = %user_id))]
    pub async fn add_member(
        &self,
        caller: &Identity,
        org_id: &OrgId,
        user_id: &UserId,
        role: Role,
    ) -> Result<Identity> {
        AccessGate::require(caller, org_id, Some(Role::Admin))?;
        self.get(org_id).await?;
        let identity = self.grant_membership(user_id, org_id, role, None).await?;
        tracing::info!(%role, "Membership granted");
        Ok(identity)
    }

    /// Upsert a membership in a user record under optimistic versioning.
    ///
    /// `fallback` seeds the record when the user has none yet.
    async fn grant_membership(
        &self,
        user_id: &UserId,
        org_id: &OrgId,
        role: Role,
        fallback: Option<&Identity>,
    ) -> Result<Identity> {
        for _ in 0..self.env.config.write_attempts {
            let doc = self
                .env
                .store
                .get(collections::USERS, user_id.as_str().to_string())
                .await?;

            let Some(doc) = doc else {
                let Some(seed) = fallback else {
                    return Err(RsvpError::not_found("User"));
                };
                let identity = seed.clone().normalized().with_membership(org_id.clone(), role);
                match self
                    .env
                    .store
                    .create(collections::USERS, user_id.as_str().to_string(), to_document(&identity)?)
                    .await
                {
                    Ok(_) => return Ok(identity),
                    Err(StoreError::Duplicate { .. }) => continue,
                    Err(e) => return Err(e.into()),
                }
            };

            let identity: Identity = doc.decode()?;
            let identity = identity.normalized().with_membership(org_id.clone(), role);
            let result = self
                .env
                .store
                .update(
                    collections::USERS,
                    doc.id,
                    json!({ "memberships": &identity.memberships }),
                    Preconditions::new().version(doc.version),
                )
                .await;
            match result {
                Ok(_) => return Ok(identity),
                Err(StoreError::PreconditionFailed { .. }) => {
                    tracing::debug!("User record changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RsvpError::conflict("user record kept changing"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rsvp_auth::CancellationSigner;
    use rsvp_testing::fixtures::{identity, seed_user};
    use rsvp_testing::{InMemoryDocumentStore, SequentialQrHashGenerator, test_clock};
    use std::sync::Arc;

    fn directory(store: &InMemoryDocumentStore) -> OrganizationDirectory {
        OrganizationDirectory::new(RsvpEnvironment::new(
            Arc::new(store.clone()),
            Arc::new(test_clock()),
            Arc::new(SequentialQrHashGenerator::new()),
            CancellationSigner::new("secret").unwrap(),
        ))
    }

    fn acme() -> NewOrganization {
        NewOrganization {
            name: "Acme Events".to_string(),
            slug: "acme".to_string(),
            description: String::new(),
            logo_url: None,
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_admin() {
        let store = InMemoryDocumentStore::new();
        let owner = identity("u1", &[]);
        seed_user(&store, &owner).await.unwrap();

        let org = directory(&store).create(&owner, acme()).await.unwrap();
        assert_eq!(org.owner_id.as_str(), "u1");

        let user: Identity = store
            .document(collections::USERS, "u1")
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(user.role_in(&org.id), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_failed_admin_grant_leaves_no_organization() {
        let store = InMemoryDocumentStore::new();
        let owner = identity("u1", &[]);
        seed_user(&store, &owner).await.unwrap();
        let directory = directory(&store);

        store.set_collection_unavailable(collections::USERS, true);
        let err = directory.create(&owner, acme()).await.unwrap_err();
        assert!(matches!(err, RsvpError::Infrastructure { .. }));
        assert!(store.is_empty(collections::ORGANIZATIONS));

        store.set_collection_unavailable(collections::USERS, false);
        let org = directory.create(&owner, acme()).await.unwrap();
        assert_eq!(org.slug, "acme");
        let user: Identity = store
            .document(collections::USERS, "u1")
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(user.role_in(&org.id), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_slug_must_be_unique() {
        let store = InMemoryDocumentStore::new();
        let directory = directory(&store);
        let owner = identity("u1", &[]);
        directory.create(&owner, acme()).await.unwrap();

        let err = directory.create(&owner, acme()).await.unwrap_err();
        assert_eq!(err, RsvpError::validation("slug", "slug already taken"));
        assert_eq!(store.len(collections::ORGANIZATIONS), 1);
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let store = InMemoryDocumentStore::new();
        let directory = directory(&store);
        let created = directory.create(&identity("u1", &[]), acme()).await.unwrap();

        assert_eq!(directory.get_by_slug("acme").await.unwrap().id, created.id);
        assert!(matches!(
            directory.get_by_slug("other").await,
            Err(RsvpError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_details_requires_admin_and_keeps_slug() {
        let store = InMemoryDocumentStore::new();
        let directory = directory(&store);
        let org = directory.create(&identity("u1", &[]), acme()).await.unwrap();
        let update = OrganizationUpdate {
            name: Some("Acme Live".to_string()),
            ..OrganizationUpdate::default()
        };

        let member = identity("u2", &[(org.id.as_str(), Role::Member)]);
        let err = directory.update_details(&member, &org.id, update.clone()).await;
        assert!(matches!(err, Err(RsvpError::Authorization { .. })));

        let admin = identity("u1", &[(org.id.as_str(), Role::Admin)]);
        let updated = directory.update_details(&admin, &org.id, update).await.unwrap();
        assert_eq!(updated.name, "Acme Live");
        assert_eq!(updated.slug, "acme");
    }

    #[tokio::test]
    async fn test_add_member_replaces_role() {
        let store = InMemoryDocumentStore::new();
        let directory = directory(&store);
        let org = directory.create(&identity("u1", &[]), acme()).await.unwrap();
        seed_user(&store, &identity("u2", &[])).await.unwrap();
        let admin = identity("u1", &[(org.id.as_str(), Role::Admin)]);
        let u2 = UserId::from_string("u2");

        directory.add_member(&admin, &org.id, &u2, Role::Member).await.unwrap();
        let promoted = directory.add_member(&admin, &org.id, &u2, Role::Admin).await.unwrap();
        assert_eq!(promoted.memberships.len(), 1);
        assert_eq!(promoted.role_in(&org.id), Some(Role::Admin));

        let missing = directory
            .add_member(&admin, &org.id, &UserId::from_string("ghost"), Role::Member)
            .await;
        assert_eq!(missing.unwrap_err(), RsvpError::not_found("User"));
    }
}
