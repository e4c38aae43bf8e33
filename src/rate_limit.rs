//! Server-provided wait hints on throttled or unavailable responses.
//!
//! rokka answers `429` and `503` with either a `Retry-After` header or an
//! `X-RateLimit-Reset` timestamp. The retry transport prefers these over its own
//! backoff curve.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns how long the server asked us to wait, if it said so.
///
/// `Retry-After` (delay-seconds or HTTP-date) wins over `X-RateLimit-Reset` /
/// `RateLimit-Reset` (Unix timestamps). Reset times in the past yield `None`.
pub(crate) fn wait_hint(headers: &HeaderMap) -> Option<Duration> {
    if let Some(delay) = parse_retry_after(headers) {
        return Some(delay);
    }

    let reset_at = parse_rate_limit_reset(headers)?;
    reset_at.duration_since(SystemTime::now()).ok()
}

/// Parses the Retry-After header.
///
/// Supports both delay-seconds (integer) and HTTP-date formats.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?;

    if let Ok(seconds) = header.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // RFC 7231 date
    let date_time = httpdate::parse_http_date(header).ok()?;
    date_time.duration_since(SystemTime::now()).ok()
}

/// Parses X-RateLimit-Reset or RateLimit-Reset headers (Unix timestamp).
fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.trim().parse::<u64>().ok())
        .and_then(|timestamp| UNIX_EPOCH.checked_add(Duration::from_secs(timestamp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        assert_eq!(wait_hint(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let mut headers = HeaderMap::new();
        let at = SystemTime::now() + Duration::from_secs(120);
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(at)).unwrap(),
        );

        let delay = wait_hint(&headers).expect("should parse HTTP date");
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));
    }

    #[test]
    fn test_parse_rate_limit_reset() {
        let mut headers = HeaderMap::new();
        let future_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 120;
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_str(&future_timestamp.to_string()).unwrap(),
        );

        let delay = wait_hint(&headers).expect("should derive delay from reset");
        assert!(delay > Duration::from_secs(100) && delay <= Duration::from_secs(120));
    }

    #[test]
    fn test_retry_after_wins_over_reset() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("99999999999"));

        assert_eq!(wait_hint(&headers), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_reset_in_past_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-reset", HeaderValue::from_static("1"));

        assert_eq!(wait_hint(&headers), None);
    }

    #[test]
    fn test_unrepresentable_reset_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_static("18446744073709551615"),
        );

        assert_eq!(wait_hint(&headers), None);
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(wait_hint(&HeaderMap::new()), None);
    }
}
