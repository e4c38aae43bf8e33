//! Turning raw responses into typed results.
//!
//! Responses with a status >= 400 go through [`status_code_error`]. Everything else is
//! handed to a [`ResponseHandler`], usually [`JsonResponseHandler`], which decodes the
//! body into a caller-owned target.

use crate::error::{AnnotatedDecodeError, ApiErrorBody, StatusCodeError};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

/// Bytes of body kept on each side of a decode failure.
pub const ANNOTATION_WINDOW: usize = 100;

/// Processes a successful response into a target value.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use rokka::{ResponseHandler, Result};
///
/// /// Keeps the body as text.
/// struct Text;
///
/// #[async_trait]
/// impl ResponseHandler<String> for Text {
///     async fn handle(&self, response: reqwest::Response, target: &mut String) -> Result<()> {
///         *target = response.text().await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ResponseHandler<T: Send>: Send + Sync {
    /// Consumes the response and writes the result into `target`.
    async fn handle(&self, response: reqwest::Response, target: &mut T) -> Result<()>;
}

/// Decodes JSON bodies. An empty body leaves the target untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseHandler;

#[async_trait]
impl<T> ResponseHandler<T> for JsonResponseHandler
where
    T: DeserializeOwned + Send,
{
    async fn handle(&self, response: reqwest::Response, target: &mut T) -> Result<()> {
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(());
        }
        *target = decode_json(&body)?;
        Ok(())
    }
}

/// Decodes `body`, annotating type mismatches with the surrounding bytes.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| match err.classify() {
        Category::Data => Error::AnnotatedDecode(annotate(err, body)),
        _ => Error::Deserialization(err),
    })
}

/// Builds the error for a response with status >= 400.
///
/// The body is read completely and the response dropped on every path. A body that
/// cannot be read is treated as empty.
pub(crate) async fn status_code_error(response: reqwest::Response) -> StatusCodeError {
    let status = response.status();

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                status = status.as_u16(),
                error = %e,
                "Failed to read error response body"
            );
            Bytes::new()
        }
    };

    let api_error = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<ApiErrorBody>(&body)
            .ok()
            .map(|parsed| parsed.error)
    };

    if status.is_client_error() {
        tracing::error!(
            status = status.as_u16(),
            response = %String::from_utf8_lossy(&body),
            "Client error (4xx)"
        );
    } else if status.is_server_error() {
        tracing::warn!(
            status = status.as_u16(),
            response = %String::from_utf8_lossy(&body),
            "Server error (5xx)"
        );
    }

    StatusCodeError {
        status,
        api_error,
        body,
    }
}

fn annotate(err: serde_json::Error, body: &[u8]) -> AnnotatedDecodeError {
    let offset = byte_offset(body, err.line(), err.column());
    let (before, after) = window(body, offset);

    tracing::debug!(
        error = %err,
        offset = offset,
        "Response body does not match expected type"
    );

    AnnotatedDecodeError::new(
        err,
        offset,
        Bytes::copy_from_slice(before),
        Bytes::copy_from_slice(after),
    )
}

/// Converts serde_json's 1-based line and byte column into an offset into `body`.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        body.iter()
            .enumerate()
            .filter(|(_, byte)| **byte == b'\n')
            .nth(line - 2)
            .map(|(index, _)| index + 1)
            .unwrap_or(body.len())
    };
    (line_start + column).min(body.len())
}

/// Splits `[offset - 100, offset + 100]`, clamped to the body, at `offset`.
fn window(body: &[u8], offset: usize) -> (&[u8], &[u8]) {
    let offset = offset.min(body.len());
    let start = offset.saturating_sub(ANNOTATION_WINDOW);
    let end = (offset + ANNOTATION_WINDOW).min(body.len());
    (&body[start..offset], &body[offset..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Image {
        hash: String,
        width: u32,
    }

    fn response(status: u16, body: &'static str) -> reqwest::Response {
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into()
    }

    #[test]
    fn test_window_in_the_middle() {
        let body = vec![b'a'; 500];
        let (before, after) = window(&body, 250);
        assert_eq!(before.len(), 100);
        assert_eq!(after.len(), 100);
    }

    #[test]
    fn test_window_clamped_at_start_and_end() {
        let body = b"0123456789";
        let (before, after) = window(body, 4);
        assert_eq!(before, b"0123");
        assert_eq!(after, b"456789");

        let (before, after) = window(body, 42);
        assert_eq!(before, b"0123456789");
        assert!(after.is_empty());
    }

    #[test]
    fn test_byte_offset_multiline() {
        let body = b"ab\ncd\nef";
        assert_eq!(byte_offset(body, 1, 2), 2);
        assert_eq!(byte_offset(body, 2, 1), 4);
        assert_eq!(byte_offset(body, 3, 2), 8);
        assert_eq!(byte_offset(body, 9, 0), body.len());
    }

    #[test]
    fn test_decode_success() {
        let image: Image = decode_json(br#"{"hash":"abc","width":640}"#).unwrap();
        assert_eq!(
            image,
            Image {
                hash: "abc".to_string(),
                width: 640
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_annotated() {
        let padding = "x".repeat(300);
        let body = format!(
            r#"{{"hash":"{}","width":"wide","trailer":"{}"}}"#,
            padding, padding
        );

        let err = decode_json::<Image>(body.as_bytes()).unwrap_err();

        let annotated = match err {
            Error::AnnotatedDecode(annotated) => annotated,
            other => panic!("Expected AnnotatedDecode, got {:?}", other),
        };
        assert_eq!(annotated.before().len(), 100);
        assert_eq!(annotated.after().len(), 100);
        assert!(annotated.before().ends_with(b"\"width\":\"wide\""));
        assert_eq!(
            annotated.before(),
            &body.as_bytes()[annotated.offset() - 100..annotated.offset()]
        );
        assert_eq!(
            annotated.after(),
            &body.as_bytes()[annotated.offset()..annotated.offset() + 100]
        );
        assert!(annotated.content().contains("\n<-->\n"));
    }

    #[test]
    fn test_window_keeps_raw_bytes_around_multibyte_text() {
        let padding = "é".repeat(60);
        // one ASCII byte shifts the window start into the middle of an "é"
        let body = format!(
            r#"{{"hash":"{}a","width":"wide","trailer":"{}"}}"#,
            padding, padding
        );

        let err = decode_json::<Image>(body.as_bytes()).unwrap_err();

        let annotated = match err {
            Error::AnnotatedDecode(annotated) => annotated,
            other => panic!("Expected AnnotatedDecode, got {:?}", other),
        };
        let offset = annotated.offset();
        assert_eq!(annotated.before(), &body.as_bytes()[offset - 100..offset]);
        assert_eq!(annotated.after(), &body.as_bytes()[offset..offset + 100]);
        assert!(std::str::from_utf8(annotated.before()).is_err());
        assert!(annotated.content().starts_with('\u{FFFD}'));
    }

    #[test]
    fn test_type_mismatch_window_clamped_in_short_body() {
        let body = r#"{"hash":"abc","width":"wide"}"#;

        let err = decode_json::<Image>(body.as_bytes()).unwrap_err();

        let annotated = match err {
            Error::AnnotatedDecode(annotated) => annotated,
            other => panic!("Expected AnnotatedDecode, got {:?}", other),
        };
        assert_eq!([annotated.before(), annotated.after()].concat(), body.as_bytes());
        assert_eq!(annotated.before().len(), annotated.offset());
    }

    #[test]
    fn test_syntax_error_is_not_annotated() {
        let err = decode_json::<Image>(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_json_handler_decodes_into_target() {
        let mut image = Image::default();
        JsonResponseHandler
            .handle(response(200, r#"{"hash":"abc","width":10}"#), &mut image)
            .await
            .unwrap();

        assert_eq!(image.hash, "abc");
        assert_eq!(image.width, 10);
    }

    #[tokio::test]
    async fn test_json_handler_empty_body_leaves_target() {
        let mut image = Image {
            hash: "untouched".to_string(),
            width: 1,
        };
        JsonResponseHandler
            .handle(response(204, ""), &mut image)
            .await
            .unwrap();

        assert_eq!(image.hash, "untouched");
        assert_eq!(image.width, 1);
    }

    #[tokio::test]
    async fn test_status_error_with_api_error() {
        let err = status_code_error(response(
            404,
            r#"{"error":{"code":404,"message":"Sourceimage not found"}}"#,
        ))
        .await;

        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let api_error = err.api_error.expect("api error should be parsed");
        assert_eq!(api_error.code, 404);
        assert_eq!(api_error.message, "Sourceimage not found");
        assert!(!err.body.is_empty());
    }

    #[tokio::test]
    async fn test_status_error_with_plain_body() {
        let err = status_code_error(response(502, "Bad Gateway")).await;

        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(err.api_error.is_none());
        assert_eq!(err.body, Bytes::from_static(b"Bad Gateway"));
    }

    #[tokio::test]
    async fn test_status_error_with_empty_body() {
        let err = status_code_error(response(401, "")).await;

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert!(err.api_error.is_none());
        assert!(err.body.is_empty());
    }
}
