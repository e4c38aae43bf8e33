//! Client configuration.
//!
//! A [`Config`] is assembled once through [`ConfigBuilder`] and is read-only afterwards.
//! Unset fields fall back to rokka's public defaults.

use crate::retry::RetryTransport;
use crate::transport::Transport;
use crate::{Error, Result};
use http::HeaderValue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default API endpoint.
pub const DEFAULT_API_ADDRESS: &str = "https://api.rokka.io";

/// Default API version sent in the `Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "1";

/// Default render host template. `{{organization}}` is replaced by the organization name.
pub const DEFAULT_IMAGE_HOST: &str = "https://{{organization}}.rokka.io";

const ORGANIZATION_PLACEHOLDER: &str = "{{organization}}";

/// Configuration for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use rokka::Config;
///
/// let config = Config::builder()
///     .api_key("secret")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.api_address(), "https://api.rokka.io");
/// assert_eq!(config.api_version(), "1");
/// assert_eq!(config.image_host_for("acme"), "https://acme.rokka.io");
/// ```
#[derive(Clone)]
pub struct Config {
    api_address: String,
    api_version: String,
    api_key: Option<String>,
    image_host: String,
    verbose: bool,
    transport: Arc<dyn Transport>,
    retry_transport: Arc<dyn Transport>,
}

impl Config {
    /// Creates a new `ConfigBuilder`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// The API endpoint all request paths are appended to.
    pub fn api_address(&self) -> &str {
        &self.api_address
    }

    /// The value sent in the `Api-Version` header.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The API key, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The render host template.
    pub fn image_host(&self) -> &str {
        &self.image_host
    }

    /// Returns the render host for an organization.
    pub fn image_host_for(&self, organization: &str) -> String {
        self.image_host.replace(ORGANIZATION_PLACEHOLDER, organization)
    }

    /// Whether requests and responses are logged at `info` instead of `debug`.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// The direct transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The transport used once auto-retry is enabled.
    pub fn retry_transport(&self) -> &Arc<dyn Transport> {
        &self.retry_transport
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_address", &self.api_address)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("image_host", &self.image_host)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Config`].
///
/// Empty strings are treated like unset values. When no retry transport is given, one
/// is derived from the primary transport with 10 attempts and a 6 second budget.
///
/// # Examples
///
/// ```
/// use rokka::{Config, RetryTransport};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let http = Arc::new(reqwest::Client::new());
/// let config = Config::builder()
///     .api_address("https://api.staging.rokka.io")
///     .api_key("secret")
///     .transport(http.clone())
///     .retry_transport(Arc::new(RetryTransport::new(http, 3, Duration::from_secs(2))))
///     .verbose(true)
///     .build()
///     .unwrap();
///
/// assert!(config.verbose());
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    api_address: Option<String>,
    api_version: Option<String>,
    api_key: Option<String>,
    image_host: Option<String>,
    verbose: bool,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
    retry_transport: Option<Arc<dyn Transport>>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder` with everything unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API endpoint, e.g. `https://api.rokka.io`.
    pub fn api_address(mut self, address: impl Into<String>) -> Self {
        self.api_address = non_empty(address.into());
        self
    }

    /// Sets the API version header value.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = non_empty(version.into());
        self
    }

    /// Sets the API key sent in the `Api-Key` header.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = non_empty(key.into());
        self
    }

    /// Sets the render host template.
    pub fn image_host(mut self, template: impl Into<String>) -> Self {
        self.image_host = non_empty(template.into());
        self
    }

    /// Logs requests and responses at `info` level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the request timeout of the default transport.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the direct transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the transport used by [`Client::auto_retry`](crate::Client::auto_retry).
    pub fn retry_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.retry_transport = Some(transport);
        self
    }

    /// Builds the `Config`, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the API address is not an absolute URL, if the version or
    /// key cannot be sent as a header value, or if the default HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<Config> {
        let api_address = self
            .api_address
            .unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string());
        Url::parse(&api_address)?;
        let api_address = api_address.trim_end_matches('/').to_string();

        let api_version = self
            .api_version
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        HeaderValue::from_str(&api_version)
            .map_err(|e| Error::ConfigurationError(format!("Invalid API version: {}", e)))?;

        if let Some(key) = &self.api_key {
            HeaderValue::from_str(key)
                .map_err(|e| Error::ConfigurationError(format!("Invalid API key: {}", e)))?;
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                let client = builder.build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?;
                Arc::new(client) as Arc<dyn Transport>
            }
        };

        let retry_transport = self.retry_transport.unwrap_or_else(|| {
            Arc::new(RetryTransport::with_defaults(transport.clone())) as Arc<dyn Transport>
        });

        Ok(Config {
            api_address,
            api_version,
            api_key: self.api_key,
            image_host: self
                .image_host
                .unwrap_or_else(|| DEFAULT_IMAGE_HOST.to_string()),
            verbose: self.verbose,
            transport,
            retry_transport,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
