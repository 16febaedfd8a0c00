use marketplace_access::http::{
    classify_status, encode_path_segment, error_from_response, extract_rate, parse_retry_after,
    RawResponse,
};
use marketplace_access::pagination::{pack_cursor, unpack_cursor};
use marketplace_access::{ErrorKind, Quota};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;

#[test]
fn composite_cursor_codec_roundtrip() {
    let fields = serde_json::json!({"updatedAt": "2024-05-01T10:00:00Z", "nmID": 7});
    let token = pack_cursor(&fields);
    assert_eq!(unpack_cursor(&token), Some(fields));
}

#[test]
fn status_error_mapping() {
    assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), ErrorKind::RateLimit);
    assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ErrorKind::Auth);
    assert_eq!(classify_status(StatusCode::NOT_FOUND), ErrorKind::Validation);
    assert_eq!(classify_status(StatusCode::BAD_GATEWAY), ErrorKind::ServerTransient);
    assert_eq!(classify_status(StatusCode::CONFLICT), ErrorKind::Unknown);
    assert!(ErrorKind::RateLimit.is_retryable());
    assert!(!ErrorKind::Validation.is_retryable());
}

#[test]
fn rate_headers() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-remaining", "0".parse().unwrap());
    h.insert("x-ratelimit-limit", "300".parse().unwrap());
    h.insert("x-ratelimit-reset", "17".parse().unwrap());
    h.insert("x-ratelimit-retry", "3".parse().unwrap());
    let rate = extract_rate(&h);
    assert_eq!(rate.limit, Some(300));
    assert_eq!(rate.exhausted_for(), Some(17));
    // no Retry-After: fall back to X-Ratelimit-Retry
    assert_eq!(parse_retry_after(&h), Some(3));
    h.insert("retry-after", "8".parse().unwrap());
    assert_eq!(parse_retry_after(&h), Some(8));
}

#[test]
fn envelope_message_and_request_id() {
    let resp = RawResponse {
        status: StatusCode::BAD_REQUEST,
        headers: HeaderMap::new(),
        body: r#"{"error":true,"errorText":"Invalid date","additionalErrors":["dateFrom"],"requestId":"b7e1"}"#
            .to_string(),
    };
    let err = error_from_response(&resp);
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "Invalid date; dateFrom");
    assert_eq!(err.request_id.as_deref(), Some("b7e1"));
    assert_eq!(err.http_status, Some(400));
}

#[test]
fn quota_strings() {
    let q = Quota::parse("1000/day").unwrap();
    assert_eq!(q.capacity, 1000);
    assert_eq!(q.window, Duration::from_secs(86_400));
    assert_eq!(q.to_string(), "1000/day");
    assert!(Quota::parse("0/min").is_err());
}

#[test]
fn url_path_segment_encoding() {
    assert_eq!(encode_path_segment("WB-GI 12/3%"), "WB-GI%2012%2F3%25");
    assert_eq!(encode_path_segment("abc-._~123"), "abc-._~123");
}
