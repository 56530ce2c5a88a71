//! Organizations: the owner/admin hierarchy that events belong to.

use crate::error::{Result, RsvpError};
use crate::ids::{OrgId, UserId};
use crate::timestamp;
use crate::validation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum organization description length, in characters.
pub const DESCRIPTION_MAX: usize = 500;

/// Stored organization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization ID
    pub id: OrgId,
    /// Display name
    pub name: String,
    /// URL slug; unique and immutable
    pub slug: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Logo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Creating user, who is granted admin
    pub owner_id: UserId,
    /// Creation time
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    /// Display name (at least 3 characters)
    pub name: String,
    /// Lowercase alphanumeric and hyphen (at least 3 characters)
    pub slug: String,
    /// Up to 500 characters
    #[serde(default)]
    pub description: String,
    /// Optional `http(s)` logo URL
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl NewOrganization {
    /// Validate the input and build the record.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`](crate::RsvpError::Validation) for a
    /// short name, a malformed slug, an overlong description or a non-http logo.
    pub fn into_organization(
        self,
        id: OrgId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Organization> {
        let name = validation::min_chars("name", &self.name, 3)?;
        let slug = self.slug.trim().to_string();
        if !validation::is_valid_slug(&slug) {
            return Err(RsvpError::validation(
                "slug",
                "must be at least 3 characters of a-z, 0-9 and '-'",
            ));
        }
        let description =
            validation::max_chars("description", self.description.trim(), DESCRIPTION_MAX)?;
        let logo_url = self
            .logo_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| validation::http_url("logoUrl", url))
            .transpose()?;

        Ok(Organization {
            id,
            name,
            slug,
            description,
            logo_url,
            owner_id,
            created_at: now,
        })
    }
}

/// Editable organization details. There is no slug field: slugs never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New logo URL
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl OrganizationUpdate {
    /// Validate and render as a shallow store patch.
    ///
    /// # Errors
    ///
    /// Returns a validation error under the same rules as creation.
    pub fn to_patch(&self) -> Result<serde_json::Value> {
        let mut patch = serde_json::Map::new();
        if let Some(name) = &self.name {
            patch.insert("name".into(), validation::min_chars("name", name, 3)?.into());
        }
        if let Some(description) = &self.description {
            let description =
                validation::max_chars("description", description.trim(), DESCRIPTION_MAX)?;
            patch.insert("description".into(), description.into());
        }
        if let Some(logo_url) = &self.logo_url {
            patch.insert("logoUrl".into(), validation::http_url("logoUrl", logo_url)?.into());
        }
        Ok(serde_json::Value::Object(patch))
    }
}
