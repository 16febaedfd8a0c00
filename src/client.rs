use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{decode_json, RawResponse, RequestExecutor, RequestSpec, ReqwestTransport, Transport};
use crate::pagination::{Extractor, PaginationCursor, Paginator};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::services::{
    AdsClient, AnalyticsClient, ContentClient, FeedbacksClient, MarketplaceClient,
    StatisticsClient,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;

struct Inner {
    credentials: CredentialProvider,
    limiter: Arc<RateLimiter>,
    executor: RequestExecutor,
    policy: RetryPolicy,
}

/// Shared entry point for all six families. Cheap to clone; clones share
/// one rate limiter and one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn from_config(cfg: &Config) -> reqwest::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(cfg)?);
        Ok(Self::with_transport(cfg, transport))
    }

    pub fn with_transport(cfg: &Config, transport: Arc<dyn Transport>) -> Self {
        let limiter = Arc::new(RateLimiter::new(cfg.quotas()));
        let mut credentials = CredentialProvider::new();
        for family in ServiceFamily::ALL {
            if let Some(c) = &cfg.family(family).credential {
                credentials = credentials.with(family, c.clone());
            }
        }
        let executor = RequestExecutor::new(transport, limiter.clone(), cfg);
        Self {
            inner: Arc::new(Inner {
                credentials,
                limiter,
                executor,
                policy: RetryPolicy::from_config(cfg),
            }),
        }
    }

    /// Same transport and limiter, different retry policy.
    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        let inner = Inner {
            credentials: self.inner.credentials.clone(),
            limiter: self.inner.limiter.clone(),
            executor: self.inner.executor.clone(),
            policy,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.inner.credentials
    }

    /// One logical call: credentials, throttling, retries.
    pub async fn perform(&self, spec: &RequestSpec) -> Result<RawResponse, ApiError> {
        let inner = &self.inner;
        inner
            .policy
            .perform(spec, &inner.credentials, &inner.limiter, &inner.executor)
            .await
    }

    /// Like [`ApiClient::perform`] but abandons the call, including any
    /// wait for a permit or a backoff, once `deadline` passes.
    pub async fn perform_with_deadline(
        &self,
        spec: &RequestSpec,
        deadline: Instant,
    ) -> Result<RawResponse, ApiError> {
        match tokio::time::timeout_at(deadline, self.perform(spec)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::timeout(format!(
                "{} {} did not finish before its deadline",
                spec.method, spec.path
            ))),
        }
    }

    pub async fn perform_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, ApiError> {
        let raw = self.perform(spec).await?;
        decode_json(&raw)
    }

    pub fn pages<T>(&self, spec: RequestSpec, extract: Extractor<T>) -> Paginator<T> {
        Paginator::new(self.clone(), spec, extract, None)
    }

    /// Continues a listing from a cursor saved off an earlier [`Paginator`].
    pub fn resume_pages<T>(
        &self,
        spec: RequestSpec,
        extract: Extractor<T>,
        cursor: PaginationCursor,
    ) -> Paginator<T> {
        Paginator::new(self.clone(), spec, extract, Some(cursor))
    }

    pub fn statistics(&self) -> StatisticsClient {
        StatisticsClient::new(self.clone())
    }

    pub fn marketplace(&self) -> MarketplaceClient {
        MarketplaceClient::new(self.clone())
    }

    pub fn content(&self) -> ContentClient {
        ContentClient::new(self.clone())
    }

    pub fn feedbacks(&self) -> FeedbacksClient {
        FeedbacksClient::new(self.clone())
    }

    pub fn analytics(&self) -> AnalyticsClient {
        AnalyticsClient::new(self.clone())
    }

    pub fn ads(&self) -> AdsClient {
        AdsClient::new(self.clone())
    }
}
