//! Organization endpoints.

use crate::request::segment;
use crate::{Client, Result};
use http::Method;
use serde::{Deserialize, Serialize};

/// An organization and its limits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub billing_email: String,
    pub limit: OrganizationLimit,
}

/// Storage and traffic limits. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrganizationLimit {
    pub space_in_bytes: Option<u64>,
    pub traffic_in_bytes: Option<u64>,
}

#[derive(Serialize)]
struct CreateOrganization<'a> {
    billing_email: &'a str,
    display_name: &'a str,
}

impl Client {
    /// Fetches an organization by name.
    pub async fn get_organization(&self, name: &str) -> Result<Organization> {
        let mut result = Organization::default();
        let request = self.new_request(
            Method::GET,
            &format!("/organizations/{}", segment(name)),
            None,
            None,
        )?;
        self.call_json(request, &mut result).await?;
        Ok(result)
    }

    /// Creates an organization.
    pub async fn create_organization(
        &self,
        name: &str,
        billing_email: &str,
        display_name: &str,
    ) -> Result<Organization> {
        let mut result = Organization::default();
        let request = self.new_json_request(
            Method::PUT,
            &format!("/organizations/{}", segment(name)),
            &CreateOrganization {
                billing_email,
                display_name,
            },
            None,
        )?;
        self.call_json(request, &mut result).await?;
        Ok(result)
    }
}
