//! Source image endpoints.

use crate::request::{attach_multipart, segment, Query};
use crate::{Client, Error, Result};
use chrono::{DateTime, Utc};
use http::Method;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Metadata attached to a source image, as free-form JSON.
pub type Metadata = Map<String, Value>;

/// A source image stored in an organization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceImage {
    pub hash: String,
    pub short_hash: String,
    pub binary_hash: String,
    pub created: DateTime<Utc>,
    pub name: String,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    pub format: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub organization: String,
    pub link: String,
    pub user_metadata: Option<Metadata>,
    pub dynamic_metadata: Option<Metadata>,
}

/// A page of source images.
///
/// Pass `cursor` back as the `cursor` query parameter to fetch the next page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListSourceImagesResponse {
    pub total: u64,
    pub items: Vec<SourceImage>,
    pub cursor: Option<String>,
    pub links: Links,
}

/// Navigation links of a listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Links {
    pub prev: Option<Link>,
    pub next: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Link {
    pub href: String,
}

/// The images created by an upload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateSourceImageResponse {
    pub total: u64,
    pub items: Vec<SourceImage>,
}

impl Client {
    /// Lists the source images of an organization.
    ///
    /// `query` is passed through unchanged, e.g. `limit`, `offset`, `cursor` or
    /// search fields such as `format` and `width`.
    pub async fn list_source_images(
        &self,
        organization: &str,
        query: Option<&Query>,
    ) -> Result<ListSourceImagesResponse> {
        let mut result = ListSourceImagesResponse::default();
        let request = self.new_request(
            Method::GET,
            &format!("/sourceimages/{}", segment(organization)),
            None,
            query,
        )?;
        self.call_json(request, &mut result).await?;
        Ok(result)
    }

    /// Fetches a single source image by hash.
    pub async fn get_source_image(&self, organization: &str, hash: &str) -> Result<SourceImage> {
        let mut result = SourceImage::default();
        let request = self.new_request(
            Method::GET,
            &format!("/sourceimages/{}/{}", segment(organization), segment(hash)),
            None,
            None,
        )?;
        self.call_json(request, &mut result).await?;
        Ok(result)
    }

    /// Uploads an image.
    pub async fn create_source_image(
        &self,
        organization: &str,
        name: &str,
        data: &[u8],
    ) -> Result<CreateSourceImageResponse> {
        self.create_source_image_with_metadata(organization, name, data, None, None)
            .await
    }

    /// Uploads an image together with user and dynamic metadata.
    ///
    /// Each dynamic metadata entry is sent as its own field, e.g. `subject_area`.
    pub async fn create_source_image_with_metadata(
        &self,
        organization: &str,
        name: &str,
        data: &[u8],
        user_metadata: Option<&Metadata>,
        dynamic_metadata: Option<&Metadata>,
    ) -> Result<CreateSourceImageResponse> {
        let mut form = Form::new();

        if let Some(user_metadata) = user_metadata {
            let json = serde_json::to_string(user_metadata).map_err(Error::Serialization)?;
            form = form.text("meta_user[0]", json);
        }
        if let Some(dynamic_metadata) = dynamic_metadata {
            for (key, value) in dynamic_metadata {
                let json = serde_json::to_string(value).map_err(Error::Serialization)?;
                form = form.text(format!("meta_dynamic[0][{}]", key), json);
            }
        }
        let file = Part::bytes(data.to_vec())
            .file_name(name.to_string())
            .mime_str("application/octet-stream")?;
        form = form.part("filedata", file);

        let request = self.new_request(
            Method::POST,
            &format!("/sourceimages/{}", segment(organization)),
            None,
            None,
        )?;
        let request = attach_multipart(request, form).await?;

        let mut result = CreateSourceImageResponse::default();
        self.call_json(request, &mut result).await?;
        Ok(result)
    }

    /// Deletes a source image.
    pub async fn delete_source_image(&self, organization: &str, hash: &str) -> Result<()> {
        let request = self.new_request(
            Method::DELETE,
            &format!("/sourceimages/{}/{}", segment(organization), segment(hash)),
            None,
            None,
        )?;
        self.call(request, &mut (), None).await
    }
}
