//! Authorization header resolution per service family.
//!
//! Nothing is cached: the token is read and checked on every call, so a
//! rotated token file or an expired signed token is noticed immediately.

use crate::error::AuthConfigError;
use crate::family::ServiceFamily;
use base64::Engine;
use reqwest::header::HeaderValue;
use std::fmt;
use std::path::PathBuf;

/// How the token is placed into `Authorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScheme {
    /// Signed token sent as `Bearer <token>`.
    Signed,
    /// Legacy static token sent verbatim.
    Legacy,
}

#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    Inline(String),
    /// Re-read on every resolve so external rotation is picked up.
    File(PathBuf),
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            TokenSource::File(p) => f.debug_tuple("File").field(p).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub scheme: CredentialScheme,
    pub source: TokenSource,
}

impl Credential {
    pub fn signed(token: impl Into<String>) -> Self {
        Self {
            scheme: CredentialScheme::Signed,
            source: TokenSource::Inline(token.into()),
        }
    }

    pub fn signed_file(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: CredentialScheme::Signed,
            source: TokenSource::File(path.into()),
        }
    }

    pub fn legacy(token: impl Into<String>) -> Self {
        Self {
            scheme: CredentialScheme::Legacy,
            source: TokenSource::Inline(token.into()),
        }
    }
}

/// A ready-to-send `Authorization` value. Marked sensitive so it never shows up in debug output.
#[derive(Clone)]
pub struct AuthHeader(HeaderValue);

impl AuthHeader {
    pub fn value(&self) -> &HeaderValue {
        &self.0
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthHeader(<redacted>)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialProvider {
    credentials: [Option<Credential>; 6],
}

impl CredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, family: ServiceFamily, credential: Credential) -> Self {
        self.credentials[family.index()] = Some(credential);
        self
    }

    pub fn is_configured(&self, family: ServiceFamily) -> bool {
        self.credentials[family.index()].is_some()
    }

    pub fn resolve(&self, family: ServiceFamily) -> Result<AuthHeader, AuthConfigError> {
        let credential = self.credentials[family.index()]
            .as_ref()
            .ok_or(AuthConfigError::Missing(family))?;
        let token = read_token(family, &credential.source)?;
        let raw = match credential.scheme {
            CredentialScheme::Signed => {
                if let Some(exp) = signed_token_expiry(&token) {
                    if exp <= chrono::Utc::now().timestamp() {
                        return Err(AuthConfigError::Expired {
                            family,
                            expired_at: format_epoch(exp),
                        });
                    }
                }
                format!("Bearer {}", token)
            }
            CredentialScheme::Legacy => token,
        };
        let mut value =
            HeaderValue::from_str(&raw).map_err(|_| AuthConfigError::InvalidHeader(family))?;
        value.set_sensitive(true);
        Ok(AuthHeader(value))
    }
}

fn read_token(family: ServiceFamily, source: &TokenSource) -> Result<String, AuthConfigError> {
    let token = match source {
        TokenSource::Inline(t) => t.trim().to_string(),
        TokenSource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| AuthConfigError::Unreadable {
                family,
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .trim()
            .to_string(),
    };
    if token.is_empty() {
        return Err(AuthConfigError::Missing(family));
    }
    Ok(token)
}

/// `exp` claim of a JWT-shaped token, if it has one. Opaque tokens yield `None`.
pub fn signed_token_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

fn format_epoch(epoch: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}
