//! The pluggable transport that actually sends requests.
//!
//! A [`Transport`] takes a fully built `reqwest::Request` and returns the response or
//! a connection-level failure. `reqwest::Client` implements it directly, and
//! [`RetryTransport`](crate::RetryTransport) wraps any other transport, so the two can be
//! swapped freely.

use crate::error::BoxError;
use async_trait::async_trait;

/// Sends a single HTTP request.
///
/// Implementations return `Err` only when no response was received. A response with
/// an error status is still `Ok`; classifying it is the caller's job.
///
/// Implementations must be safe to call concurrently if the client is shared across
/// tasks or threads.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use rokka::{BoxError, Transport};
///
/// struct Logging(reqwest::Client);
///
/// #[async_trait]
/// impl Transport for Logging {
///     async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
///         println!("{} {}", request.method(), request.url());
///         Ok(self.0.execute(request).await?)
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and waits for the response head.
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}
