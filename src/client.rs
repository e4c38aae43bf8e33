//! The rokka API client.
//!
//! Every API call goes through [`Client::call`]: headers are injected, the request is
//! sent through the active transport, and the response is either classified as a
//! [`StatusCodeError`](crate::StatusCodeError) or handed to a response handler.

use crate::config::Config;
use crate::request::{self, Query};
use crate::response::{self, JsonResponseHandler, ResponseHandler};
use crate::transport::Transport;
use crate::{Error, Result};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;

/// Header carrying the API version.
pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("api-version");

/// Header carrying the API key.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("api-key");

/// Client for the rokka API.
///
/// A `Client` is cheap to clone and never changes after construction. Enabling
/// automatic retries with [`auto_retry`](Client::auto_retry) returns a new client and
/// leaves the original alone, so both can be used side by side from different tasks.
///
/// # Examples
///
/// ```no_run
/// use rokka::{Client, Config};
///
/// # async fn example() -> Result<(), rokka::Error> {
/// let client = Client::new(Config::builder().api_key("secret").build()?);
///
/// // single attempt
/// let images = client.list_source_images("acme", None).await?;
/// println!("{} images", images.total);
///
/// // retried on 429/502/503 and connection failures
/// let image = client.auto_retry().get_source_image("acme", "0dcabb").await?;
/// println!("{}", image.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client that sends through the config's direct transport.
    pub fn new(config: Config) -> Self {
        let transport = config.transport().clone();
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// The client's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The transport requests are currently sent through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns `true` if this client sends through the retry transport.
    pub fn is_auto_retry(&self) -> bool {
        Arc::ptr_eq(&self.transport, self.config.retry_transport())
    }

    /// Returns a copy of this client that sends through the retry transport.
    ///
    /// By default that transport makes at most 10 attempts within 6 seconds and
    /// retries on:
    ///  - a 429, 502, or 503 response
    ///  - a connection error
    ///
    /// The configuration is shared, not copied, and `self` is not modified.
    pub fn auto_retry(&self) -> Client {
        Client {
            config: Arc::clone(&self.config),
            transport: Arc::clone(self.config.retry_transport()),
        }
    }

    /// Builds a request for `path` relative to the configured API address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the resulting URL cannot be parsed.
    pub fn new_request(
        &self,
        method: Method,
        path: &str,
        body: Option<reqwest::Body>,
        query: Option<&Query>,
    ) -> Result<reqwest::Request> {
        request::build(self.config.api_address(), method, path, body, query)
    }

    /// Builds a request with `body` serialized as JSON.
    pub fn new_json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        query: Option<&Query>,
    ) -> Result<reqwest::Request> {
        let body = request::json_body(body)?;
        self.new_request(method, path, Some(body), query)
    }

    /// Executes a request.
    ///
    /// Adds the `Api-Version`, `Accept`, `Api-Key` (unless already set) and
    /// `Content-Type` (unless already set) headers, then sends the request through the
    /// active transport.
    ///
    /// - A transport failure is returned as [`Error::Transport`].
    /// - A status >= 400 is returned as [`Error::Status`].
    /// - Otherwise `handler`, if any, processes the response into `target`.
    pub async fn call<T: Send>(
        &self,
        mut request: reqwest::Request,
        target: &mut T,
        handler: Option<&dyn ResponseHandler<T>>,
    ) -> Result<()> {
        self.inject_headers(&mut request)?;

        if self.config.verbose() {
            tracing::info!(method = %request.method(), url = %request.url(), "Sending request");
        } else {
            tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");
        }

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(Error::Transport)?;

        let status = response.status();
        if self.config.verbose() {
            tracing::info!(status = status.as_u16(), "Received response");
        } else {
            tracing::debug!(status = status.as_u16(), "Received response");
        }

        if status.as_u16() >= 400 {
            return Err(response::status_code_error(response).await.into());
        }

        match handler {
            Some(handler) => handler.handle(response, target).await,
            None => Ok(()),
        }
    }

    /// Executes a request and decodes the JSON response into `target`.
    ///
    /// An empty response body leaves `target` untouched.
    pub async fn call_json<T>(&self, request: reqwest::Request, target: &mut T) -> Result<()>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let handler: &dyn ResponseHandler<T> = &JsonResponseHandler;
        self.call(request, target, Some(handler)).await
    }

    /// Checks whether the configured API key is accepted by the API.
    ///
    /// Returns `Ok(false)` if the API answers `403`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] without sending anything if no key is
    /// configured, and any other error of the call unchanged.
    pub async fn valid_api_key(&self) -> Result<bool> {
        if self.config.api_key().is_none() {
            return Err(Error::MissingApiKey);
        }

        let request = self.new_request(Method::GET, "/", None, None)?;
        let mut ignored = serde::de::IgnoredAny;
        match self.call_json(request, &mut ignored).await {
            Ok(()) => Ok(true),
            Err(Error::Status(err)) if err.status == StatusCode::FORBIDDEN => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn inject_headers(&self, request: &mut reqwest::Request) -> Result<()> {
        let api_version = HeaderValue::from_str(self.config.api_version())
            .map_err(|e| Error::ConfigurationError(format!("Invalid API version: {}", e)))?;

        let headers = request.headers_mut();
        headers.insert(API_VERSION_HEADER, api_version);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = self.config.api_key() {
            if !headers.contains_key(API_KEY_HEADER) {
                let key = HeaderValue::from_str(key)
                    .map_err(|e| Error::ConfigurationError(format!("Invalid API key: {}", e)))?;
                headers.insert(API_KEY_HEADER, key);
            }
        }

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("auto_retry", &self.is_auto_retry())
            .finish()
    }
}
