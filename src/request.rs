//! Request construction.
//!
//! Requests are plain `reqwest::Request` values: the configured API address joined with
//! a path, an optional body and an optional query. Nothing is sent here.

use crate::{Error, Result};
use http::Method;
use http_body_util::BodyExt;
use percent_encoding::{AsciiSet, PercentEncode, CONTROLS};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

// Characters that would end or split a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Query parameters of a request. Order does not matter; they are encoded sorted by key.
pub type Query = HashMap<String, String>;

/// Builds a request for `address + path`.
///
/// Query parameters, if any, are form-urlencoded and appended to the URL.
pub(crate) fn build(
    address: &str,
    method: Method,
    path: &str,
    body: Option<reqwest::Body>,
    query: Option<&Query>,
) -> Result<reqwest::Request> {
    let mut url = Url::parse(&format!("{}{}", address, path))?;

    if let Some(query) = query.filter(|query| !query.is_empty()) {
        let mut pairs: Vec<_> = query.iter().collect();
        pairs.sort();
        url.query_pairs_mut().extend_pairs(pairs);
    }

    let mut request = reqwest::Request::new(method, url);
    *request.body_mut() = body;
    Ok(request)
}

/// Percent-encodes a caller-supplied value for use as a single path segment.
pub(crate) fn segment(value: &str) -> PercentEncode<'_> {
    percent_encoding::utf8_percent_encode(value, SEGMENT)
}

/// Attaches `form` to `request` as a fully buffered `multipart/form-data` body.
///
/// Sets `Content-Type` with the form's boundary. The buffered body can be cloned, so
/// uploads remain eligible for retries.
pub(crate) async fn attach_multipart(
    request: reqwest::Request,
    form: reqwest::multipart::Form,
) -> Result<reqwest::Request> {
    let mut request = reqwest::RequestBuilder::from_parts(encoder()?, request)
        .multipart(form)
        .build()?;

    if let Some(body) = request.body_mut().take() {
        let bytes = body
            .collect()
            .await
            .map_err(|e| Error::Transport(e.into()))?
            .to_bytes();
        *request.body_mut() = Some(reqwest::Body::from(bytes));
    }

    Ok(request)
}

// Only used to encode forms; never sends anything.
fn encoder() -> Result<reqwest::Client> {
    static ENCODER: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = ENCODER.get() {
        return Ok(client.clone());
    }
    let client = reqwest::Client::builder().build()?;
    Ok(ENCODER.get_or_init(|| client).clone())
}

/// Serializes `value` into a JSON request body.
pub(crate) fn json_body<T: Serialize + ?Sized>(value: &T) -> Result<reqwest::Body> {
    let json = serde_json::to_vec(value).map_err(Error::Serialization)?;
    Ok(reqwest::Body::from(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_address_and_path() {
        let request = build(
            "https://api.rokka.io",
            Method::GET,
            "/sourceimages/acme",
            None,
            None,
        )
        .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.rokka.io/sourceimages/acme"
        );
        assert!(request.body().is_none());
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_encodes_query_sorted() {
        let query: Query = [
            ("offset", "20"),
            ("limit", "10"),
            ("created", "2017-11-14T10:10:40+00:00"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let request = build(
            "https://api.rokka.io",
            Method::GET,
            "/sourceimages/acme",
            None,
            Some(&query),
        )
        .unwrap();

        assert_eq!(
            request.url().query(),
            Some("created=2017-11-14T10%3A10%3A40%2B00%3A00&limit=10&offset=20")
        );
    }

    #[test]
    fn test_empty_query_adds_nothing() {
        let request = build(
            "https://api.rokka.io",
            Method::GET,
            "/",
            None,
            Some(&Query::new()),
        )
        .unwrap();

        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn test_invalid_url() {
        let result = build("not a url", Method::GET, "/", None, None);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_segment_escapes_separators() {
        assert_eq!(segment("acme").to_string(), "acme");
        assert_eq!(segment("a/b?c#d").to_string(), "a%2Fb%3Fc%23d");
        assert_eq!(segment("100% off").to_string(), "100%25%20off");

        let request = build(
            "https://api.rokka.io",
            Method::GET,
            &format!("/sourceimages/{}", segment("acme/../x?y")),
            None,
            None,
        )
        .unwrap();
        assert_eq!(request.url().path(), "/sourceimages/acme%2F..%2Fx%3Fy");
        assert_eq!(request.url().query(), None);
    }

    #[tokio::test]
    async fn test_multipart_body_is_buffered() {
        let request = build(
            "https://api.rokka.io",
            Method::POST,
            "/sourceimages/acme",
            None,
            None,
        )
        .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("meta_user[0]", r#"{"key1":"value1"}"#)
            .part(
                "filedata",
                reqwest::multipart::Part::bytes(b"\x89PNG".to_vec()).file_name("image.png"),
            );
        let boundary = form.boundary().to_string();

        let request = attach_multipart(request, form).await.unwrap();

        assert_eq!(
            request.headers()[http::header::CONTENT_TYPE],
            format!("multipart/form-data; boundary={}", boundary).as_str()
        );
        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let text = String::from_utf8_lossy(body);
        assert!(text.contains("name=\"meta_user[0]\""));
        assert!(text.contains(r#"{"key1":"value1"}"#));
        assert!(text.contains("name=\"filedata\"; filename=\"image.png\""));
        assert!(text.ends_with(&format!("--{}--\r\n", boundary)));
        assert!(request.try_clone().is_some());
    }

    #[test]
    fn test_json_body() {
        let body = json_body(&serde_json::json!({"name": "acme"})).unwrap();
        assert_eq!(body.as_bytes(), Some(&br#"{"name":"acme"}"#[..]));
    }
}
