//! # rokka - a client for the rokka image API
//!
//! Typed calls are turned into authenticated HTTP requests, sent through a pluggable
//! [`Transport`], and the responses are turned back into typed results or structured
//! errors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rokka::{Client, Config};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rokka::Error> {
//!     let client = Client::new(Config::builder().api_key("secret").build()?);
//!
//!     if !client.valid_api_key().await? {
//!         eprintln!("API key was rejected");
//!         return Ok(());
//!     }
//!
//!     let query = HashMap::from([("limit".to_string(), "10".to_string())]);
//!     let images = client
//!         .auto_retry()
//!         .list_source_images("acme", Some(&query))
//!         .await?;
//!     for image in &images.items {
//!         println!("{} {}x{}", image.hash, image.width, image.height);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Calling endpoints directly
//!
//! Endpoints without a dedicated method can go through the same pipeline:
//!
//! ```no_run
//! use http::Method;
//! use rokka::{Client, Config};
//!
//! # async fn example() -> Result<(), rokka::Error> {
//! let client = Client::new(Config::builder().api_key("secret").build()?);
//!
//! let request = client.new_request(Method::GET, "/stacks/acme", None, None)?;
//! let mut stacks = serde_json::Value::Null;
//! client.call_json(request, &mut stacks).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All failures are variants of [`Error`]:
//!
//! - [`Error::MissingApiKey`] - the operation needs a key and none is configured
//! - [`Error::Transport`] - no response was received
//! - [`Error::Status`] - the API answered with a status >= 400
//! - [`Error::AnnotatedDecode`] - the body did not match the expected type; the error
//!   carries up to 100 bytes of body on each side of the mismatch
//!
//! ## Retries
//!
//! [`Client::auto_retry`] returns a client that sends through the configured
//! [`RetryTransport`]. It retries `429`, `502`, `503` and connection failures, at most
//! 10 times within 6 seconds unless configured otherwise.

mod client;
mod config;
mod error;
mod organizations;
mod rate_limit;
mod request;
mod response;
pub mod retry;
mod sourceimages;
mod stackoptions;
mod transport;

pub use client::{Client, API_KEY_HEADER, API_VERSION_HEADER};
pub use config::{
    Config, ConfigBuilder, DEFAULT_API_ADDRESS, DEFAULT_API_VERSION, DEFAULT_IMAGE_HOST,
};
pub use error::{AnnotatedDecodeError, ApiError, BoxError, Error, Result, StatusCodeError};
pub use organizations::{Organization, OrganizationLimit};
pub use request::Query;
pub use response::{decode_json, JsonResponseHandler, ResponseHandler, ANNOTATION_WINDOW};
pub use retry::{RetryStrategy, RetryTransport};
pub use sourceimages::{
    CreateSourceImageResponse, Link, Links, ListSourceImagesResponse, Metadata, SourceImage,
};
pub use stackoptions::StackOptions;
pub use transport::Transport;
