use crate::family::ServiceFamily;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed call. Only the transient kinds and
/// `RateLimit` are retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    AuthConfig,
    #[serde(rename = "rate_limited")]
    RateLimit,
    Validation,
    ServerTransient,
    NetworkTransient,
    Decode,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::ServerTransient | ErrorKind::NetworkTransient
        )
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::AuthConfig => "auth_config",
            ErrorKind::RateLimit => "rate_limited",
            ErrorKind::Validation => "validation",
            ErrorKind::ServerTransient => "server_transient",
            ErrorKind::NetworkTransient => "network_transient",
            ErrorKind::Decode => "decode",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

/// Terminal error handed to callers of the access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
    /// Remote correlation id, quoted when contacting platform support.
    pub request_id: Option<String>,
    pub retry_after_seconds: Option<u64>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
            request_id: None,
            retry_after_seconds: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_seconds.map(Duration::from_secs)
    }

    pub fn decode(message: impl Into<String>, request_id: Option<String>) -> Self {
        Self::new(ErrorKind::Decode, message).with_request_id(request_id)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
}

/// Credential could not be produced for a family. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthConfigError {
    #[error("no credential configured for the {0} API")]
    Missing(ServiceFamily),
    #[error("credential for the {family} API expired at {expired_at}")]
    Expired {
        family: ServiceFamily,
        expired_at: String,
    },
    #[error("credential for the {family} API cannot be read from {path}: {reason}")]
    Unreadable {
        family: ServiceFamily,
        path: String,
        reason: String,
    },
    #[error("credential for the {0} API is not a valid header value")]
    InvalidHeader(ServiceFamily),
}

impl From<AuthConfigError> for ApiError {
    fn from(e: AuthConfigError) -> Self {
        ApiError::new(ErrorKind::AuthConfig, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: String, reason: String },
}

impl ConfigError {
    pub fn invalid(var: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidVar {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
