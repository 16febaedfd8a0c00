//! Scripted transport and canned clients for unit tests.

use crate::client::ApiClient;
use crate::config::Config;
use crate::family::ServiceFamily;
use crate::http::{OutboundRequest, RawResponse, Transport, TransportError};
use crate::rate_limit::Quota;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

type Responder = Box<dyn Fn(&OutboundRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub authorization: String,
}

pub struct ScriptedTransport {
    respond: Responder,
    count: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Answers each request with `f(request, zero_based_index)`.
    pub fn from_fn<F>(f: F) -> Arc<Self>
    where
        F: Fn(&OutboundRequest, usize) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(f),
            count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Replays `script` in order; the last entry repeats once it runs out.
    pub fn sequence(script: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        assert!(!script.is_empty(), "script needs at least one response");
        Self::from_fn(move |_, idx| script[idx.min(script.len() - 1)].clone())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let idx = self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(RecordedCall {
            at: Instant::now(),
            method: request.method.clone(),
            url: request.url.clone(),
            body: request.body.clone(),
            authorization: request.authorization.to_str().unwrap_or_default().to_string(),
        });
        (self.respond)(&request, idx)
    }
}

pub fn json_response(status: u16, body: Value) -> RawResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    RawResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.to_string(),
    }
}

/// Every family on `http://mock.local` with token `t` and quotas too large to matter.
pub fn test_config() -> Config {
    let mut cfg = Config::with_base_url("http://mock.local", "t").unwrap();
    for family in ServiceFamily::ALL {
        cfg.family_mut(family).quota = Quota::new(1_000, Duration::from_secs(1));
    }
    cfg.backoff_base_ms = 10;
    cfg.backoff_max_ms = 100;
    cfg.max_attempts = 5;
    cfg
}

pub fn test_client(transport: Arc<ScriptedTransport>) -> ApiClient {
    test_client_with(transport, RetryPolicy::from_config(&test_config()).without_jitter())
}

pub fn test_client_with(transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> ApiClient {
    client_from(&test_config(), transport, policy)
}

pub fn client_from(cfg: &Config, transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> ApiClient {
    ApiClient::with_transport(cfg, transport).with_policy(policy)
}
