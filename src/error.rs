//! Error types for rokka API calls.
//!
//! Every failure a call can produce is a variant of [`Error`], so callers can match
//! exhaustively. Failures that carry response data ([`StatusCodeError`] and
//! [`AnnotatedDecodeError`]) keep enough of the raw body around to debug them later.

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;
use std::fmt;

/// A boxed error as returned by a [`Transport`](crate::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for rokka API calls.
///
/// # Examples
///
/// ```no_run
/// use rokka::{Client, Config, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new(Config::builder().api_key("secret").build()?);
///
/// match client.get_source_image("my-org", "0dcabb").await {
///     Ok(image) => println!("{} ({}x{})", image.name, image.width, image.height),
///     Err(Error::Status(err)) => {
///         eprintln!("API returned {}", err.status);
///         if let Some(api_error) = &err.api_error {
///             eprintln!("  {} (code {})", api_error.message, api_error.code);
///         }
///     }
///     Err(Error::AnnotatedDecode(err)) => {
///         eprintln!("Unexpected payload: {}", err);
///         eprintln!("{}", err.content());
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The operation needs an API key and none is configured.
    ///
    /// Raised before any request is sent.
    #[error("API key must be set")]
    MissingApiKey,

    /// The transport failed to produce a response (connection refused, DNS, TLS, ...).
    ///
    /// The underlying error is kept unchanged and can be downcast, e.g. to
    /// `reqwest::Error`.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The server answered with a status code >= 400.
    #[error(transparent)]
    Status(#[from] StatusCodeError),

    /// A successful response whose body did not match the expected type.
    #[error(transparent)]
    AnnotatedDecode(#[from] AnnotatedDecodeError),

    /// A successful response whose body is not valid JSON.
    #[error("Failed to deserialize response: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A request body could not be serialized to JSON.
    #[error("Failed to serialize request: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration was provided, such as a header value that is not
    /// valid ASCII.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Returns the HTTP status code if the server answered with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status(err) => Some(err.status),
            _ => None,
        }
    }

    /// Returns the raw response body of a status error.
    pub fn raw_response(&self) -> Option<&[u8]> {
        match self {
            Error::Status(err) => Some(&err.body),
            _ => None,
        }
    }

    /// Returns `true` if this is a status error with the given code.
    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

/// An error reported by the rokka API in the body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// The API-level error code. Usually mirrors the HTTP status.
    pub code: i64,
    /// Human readable description.
    pub message: String,
}

/// Wire shape of an error body: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub(crate) error: ApiError,
}

/// Returned when a response has a status code >= 400.
///
/// `api_error` is only present if the body was non-empty and matched the API's
/// error shape. The raw body is always kept.
#[derive(Debug, Clone)]
pub struct StatusCodeError {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The parsed API error, if the body contained one.
    pub api_error: Option<ApiError>,
    /// The raw response body.
    pub body: Bytes,
}

impl StatusCodeError {
    /// Returns the numeric status code.
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Display for StatusCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rokka: Status Code {}", self.status.as_u16())?;
        if let Some(api_error) = &self.api_error {
            write!(f, " ({})", api_error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for StatusCodeError {}

/// A JSON type mismatch, annotated with the body around the offending position.
///
/// `before` holds up to 100 raw bytes preceding the offset and `after` up to 100 raw
/// bytes following it, clamped to the bounds of the body. Either half may start or end
/// inside a multi-byte character.
#[derive(Debug)]
pub struct AnnotatedDecodeError {
    source: serde_json::Error,
    offset: usize,
    before: Bytes,
    after: Bytes,
}

impl AnnotatedDecodeError {
    pub(crate) fn new(
        source: serde_json::Error,
        offset: usize,
        before: Bytes,
        after: Bytes,
    ) -> Self {
        Self {
            source,
            offset,
            before,
            after,
        }
    }

    /// Byte offset in the body where decoding failed.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The body bytes preceding the offset.
    pub fn before(&self) -> &[u8] {
        &self.before
    }

    /// The body bytes following the offset.
    pub fn after(&self) -> &[u8] {
        &self.after
    }

    /// Both halves of the window as text, separated by a `<-->` marker line.
    ///
    /// Invalid UTF-8, such as a character split at the window edge, is replaced.
    pub fn content(&self) -> String {
        format!(
            "{}\n<-->\n{}",
            String::from_utf8_lossy(&self.before),
            String::from_utf8_lossy(&self.after)
        )
    }

    /// The underlying serde error.
    pub fn serde_error(&self) -> &serde_json::Error {
        &self.source
    }
}

impl fmt::Display for AnnotatedDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

impl std::error::Error for AnnotatedDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A specialized `Result` type for rokka API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_error_display() {
        let err = StatusCodeError {
            status: StatusCode::NOT_FOUND,
            api_error: None,
            body: Bytes::new(),
        };
        assert_eq!(err.to_string(), "rokka: Status Code 404");

        let err = StatusCodeError {
            status: StatusCode::NOT_FOUND,
            api_error: Some(ApiError {
                code: 404,
                message: "Organization not found".to_string(),
            }),
            body: Bytes::from_static(b"{}"),
        };
        assert_eq!(
            err.to_string(),
            "rokka: Status Code 404 (Organization not found)"
        );
    }

    #[test]
    fn test_error_accessors() {
        let err = Error::from(StatusCodeError {
            status: StatusCode::FORBIDDEN,
            api_error: None,
            body: Bytes::from_static(b"denied"),
        });
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.is_status(StatusCode::FORBIDDEN));
        assert_eq!(err.raw_response(), Some(&b"denied"[..]));

        assert_eq!(Error::MissingApiKey.status(), None);
        assert_eq!(Error::MissingApiKey.raw_response(), None);
    }

    #[test]
    fn test_api_error_body_shape() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":{"code":403,"message":"Forbidden"}}"#).unwrap();
        assert_eq!(body.error.code, 403);
        assert_eq!(body.error.message, "Forbidden");

        assert!(serde_json::from_str::<ApiErrorBody>(r#"{"message":"nope"}"#).is_err());
    }

    #[test]
    fn test_annotated_content() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = AnnotatedDecodeError::new(
            source,
            3,
            Bytes::from_static(b"\"x\""),
            Bytes::new(),
        );
        assert_eq!(err.content(), "\"x\"\n<-->\n");
        assert_eq!(err.to_string(), err.serde_error().to_string());
    }
}
