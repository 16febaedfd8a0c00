//! Rate-limited, retrying access to the six marketplace seller REST API
//! families. Start from [`ApiClient::from_config`] and reach each family
//! through its façade (`client.statistics()`, `client.feedbacks()`, ...).

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod family;
pub mod http;
pub mod pagination;
pub mod rate_limit;
pub mod retry;
pub mod services;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{Credential, CredentialProvider};
pub use client::ApiClient;
pub use config::Config;
pub use error::{ApiError, AuthConfigError, ConfigError, ErrorKind};
pub use family::ServiceFamily;
pub use http::RequestSpec;
pub use pagination::{Page, PageStyle, PaginationCursor, Paginator};
pub use rate_limit::{Quota, RateLimiter};
pub use retry::RetryPolicy;
