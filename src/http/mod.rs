mod request;
mod transport;

pub use request::{set_body_field, RequestSpec};
pub use transport::{
    build_client, OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError,
};

use crate::auth::AuthHeader;
use crate::config::Config;
use crate::error::{ApiError, ErrorKind};
use crate::family::ServiceFamily;
use crate::rate_limit::RateLimiter;
use crate::types::RateMeta;
use log::{error, info};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Wait assumed for a 429 that names no wait of its own.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Longest wait accepted from a server header; larger values are clamped.
pub const MAX_SERVER_WAIT_SECS: u64 = 86_400;

/// Uniform error envelope shared by all six families.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub error_text: Option<String>,
    #[serde(default)]
    pub additional_errors: Option<serde_json::Value>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    fn message(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(t) = self.error_text.as_deref().filter(|t| !t.is_empty()) {
            parts.push(t.to_string());
        }
        match &self.additional_errors {
            Some(serde_json::Value::Array(items)) => parts.extend(items.iter().map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            Some(serde_json::Value::String(s)) if !s.is_empty() => parts.push(s.clone()),
            Some(serde_json::Value::Object(map)) if !map.is_empty() => {
                parts.push(serde_json::Value::Object(map.clone()).to_string())
            }
            _ => {}
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimit,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ErrorKind::Validation
        }
        s if s.is_server_error() => ErrorKind::ServerTransient,
        _ => ErrorKind::Unknown,
    }
}

pub fn classify_transport(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Timeout(_) | TransportError::Network(_) => ErrorKind::NetworkTransient,
        TransportError::Invalid(_) => ErrorKind::Unknown,
    }
}

/// `Retry-After` as delta-seconds or an HTTP date, falling back to `X-Ratelimit-Retry`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let standard = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            let raw = raw.trim();
            raw.parse::<u64>().ok().or_else(|| {
                chrono::DateTime::parse_from_rfc2822(raw).ok().map(|at| {
                    let delta = at.timestamp() - chrono::Utc::now().timestamp();
                    delta.max(0) as u64
                })
            })
        });
    standard
        .or_else(|| header_u64(headers, "x-ratelimit-retry"))
        .map(|secs| secs.min(MAX_SERVER_WAIT_SECS))
}

pub fn extract_rate(headers: &HeaderMap) -> RateMeta {
    RateMeta {
        limit: header_u64(headers, "x-ratelimit-limit").map(|v| v as u32),
        remaining: header_u64(headers, "x-ratelimit-remaining").map(|v| v as u32),
        reset_secs: header_u64(headers, "x-ratelimit-reset").map(|s| s.min(MAX_SERVER_WAIT_SECS)),
        retry_secs: header_u64(headers, "x-ratelimit-retry").map(|s| s.min(MAX_SERVER_WAIT_SECS)),
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

pub fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Builds the terminal error for a non-2xx response.
pub fn error_from_response(resp: &RawResponse) -> ApiError {
    let kind = classify_status(resp.status);
    let body = ErrorBody::parse(&resp.body).unwrap_or_default();
    let message = body.message().unwrap_or_else(|| {
        let text = resp.body.trim();
        if text.is_empty() {
            resp.status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            text.chars().take(512).collect()
        }
    });
    let request_id = body
        .request_id
        .filter(|r| !r.is_empty())
        .or_else(|| request_id_from_headers(&resp.headers));
    let mut err = ApiError::new(kind, message)
        .with_status(resp.status.as_u16())
        .with_request_id(request_id);
    if kind == ErrorKind::RateLimit {
        err = err.with_retry_after(parse_retry_after(&resp.headers).unwrap_or(DEFAULT_RETRY_AFTER_SECS));
    }
    err
}

/// Decodes a 2xx payload. A body carrying the error envelope with
/// `error: true` is a Validation failure; a body that does not match `T` is
/// a Decode failure.
pub fn decode_json<T: DeserializeOwned>(resp: &RawResponse) -> Result<T, ApiError> {
    let request_id = || request_id_from_headers(&resp.headers);
    let value: serde_json::Value = serde_json::from_str(&resp.body).map_err(|e| {
        error!(
            "malformed JSON in {} response (request id {:?}): {}",
            resp.status,
            request_id(),
            e
        );
        ApiError::decode(format!("malformed JSON: {}", e), request_id())
            .with_status(resp.status.as_u16())
    })?;
    if value.get("error").and_then(|v| v.as_bool()) == Some(true) {
        let body: ErrorBody = serde_json::from_value(value).unwrap_or_default();
        let message = body.message().unwrap_or_else(|| "request rejected".into());
        let request_id = body.request_id.or_else(request_id);
        return Err(ApiError::new(ErrorKind::Validation, message)
            .with_status(resp.status.as_u16())
            .with_request_id(request_id));
    }
    serde_json::from_value(value).map_err(|e| {
        error!(
            "unexpected payload shape in {} response (request id {:?}): {}",
            resp.status,
            request_id(),
            e
        );
        ApiError::decode(format!("unexpected payload: {}", e), request_id())
            .with_status(resp.status.as_u16())
    })
}

/// Percent-encodes one path segment (ids embedded in paths).
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Issues exactly one call and classifies the outcome.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    endpoints: [Url; 6],
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>, cfg: &Config) -> Self {
        Self {
            transport,
            limiter,
            endpoints: ServiceFamily::ALL.map(|f| cfg.family(f).base_url.clone()),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    pub fn base_url(&self, family: ServiceFamily) -> &Url {
        &self.endpoints[family.index()]
    }

    /// On 429 the family's bucket is frozen for the server-asserted window
    /// before the error is returned.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        header: &AuthHeader,
    ) -> Result<RawResponse, ApiError> {
        let url = spec.url(self.base_url(spec.family))?;
        let request = OutboundRequest {
            method: spec.method.clone(),
            url,
            authorization: header.value().clone(),
            body: spec.body.clone(),
            timeout: self.timeout,
        };
        let resp = match self.transport.send(request).await {
            Ok(r) => r,
            Err(e) => return Err(ApiError::new(classify_transport(&e), e.to_string())),
        };
        let rate = extract_rate(&resp.headers);
        if resp.status.is_success() {
            if let Some(reset) = rate.exhausted_for() {
                info!("{} quota exhausted server-side; pausing {}s", spec.family, reset);
                self.limiter.freeze_for(spec.family, Duration::from_secs(reset));
            }
            return Ok(resp);
        }
        let err = error_from_response(&resp);
        if err.kind == ErrorKind::RateLimit {
            let secs = err.retry_after_seconds.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            self.limiter.freeze_for(spec.family, Duration::from_secs(secs));
        }
        Err(err)
    }
}
