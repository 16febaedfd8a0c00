use crate::auth::Credential;
use crate::error::ConfigError;
use crate::family::ServiceFamily;
use crate::rate_limit::Quota;
use std::env;
use url::Url;

const PREFIX: &str = "MARKETPLACE";

/// Per-family endpoint, quota and credential.
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    pub base_url: Url,
    pub quota: Quota,
    pub credential: Option<Credential>,
}

/// Runtime configuration for the marketplace API access layer.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    families: [FamilyConfig; 6],
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Longest wait for a rate-limit permit; `None` waits indefinitely.
    pub acquire_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars (`<F>` is one of STATISTICS, MARKETPLACE, CONTENT, FEEDBACKS, ANALYTICS, ADS):
    /// - MARKETPLACE_API_TOKEN: signed token for every family without its own
    /// - MARKETPLACE_<F>_TOKEN_FILE / MARKETPLACE_<F>_TOKEN: signed token for one family
    /// - MARKETPLACE_<F>_LEGACY_TOKEN: static token sent verbatim
    /// - MARKETPLACE_<F>_URL, MARKETPLACE_BASE_URL: endpoint overrides
    /// - MARKETPLACE_<F>_QUOTA (e.g. `300/min`, `1000/day`)
    /// - MARKETPLACE_HTTP_TIMEOUT_SECS (default: 30)
    /// - MARKETPLACE_MAX_ATTEMPTS (default: 5)
    /// - MARKETPLACE_BACKOFF_BASE_MS / MARKETPLACE_BACKOFF_MAX_MS (default: 500 / 30000)
    /// - MARKETPLACE_ACQUIRE_TIMEOUT_SECS (default: unbounded)
    /// - MARKETPLACE_USER_AGENT (default: marketplace-access/<version>)
    ///
    /// Missing tokens are not an error here; the first call to that family fails instead.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let global_token = var(&format!("{}_API_TOKEN", PREFIX));
        let global_base = var(&format!("{}_BASE_URL", PREFIX));

        let mut families = Vec::with_capacity(ServiceFamily::ALL.len());
        for family in ServiceFamily::ALL {
            let key = |suffix: &str| format!("{}_{}_{}", PREFIX, family.env_key(), suffix);

            let url_var = key("URL");
            let base_url = match var(&url_var).or_else(|| global_base.clone()) {
                Some(raw) => parse_url(&url_var, &raw)?,
                None => parse_url(&url_var, family.default_base_url())?,
            };

            let quota_var = key("QUOTA");
            let quota = match var(&quota_var) {
                Some(raw) => Quota::parse(&raw).map_err(|e| ConfigError::invalid(&quota_var, e))?,
                None => family.default_quota(),
            };

            // Signed tokens win over legacy ones.
            let credential = var(&key("TOKEN_FILE"))
                .map(Credential::signed_file)
                .or_else(|| var(&key("TOKEN")).map(Credential::signed))
                .or_else(|| global_token.clone().map(Credential::signed))
                .or_else(|| var(&key("LEGACY_TOKEN")).map(Credential::legacy));

            families.push(FamilyConfig {
                base_url,
                quota,
                credential,
            });
        }
        let families: [FamilyConfig; 6] = families
            .try_into()
            .map_err(|_| ConfigError::invalid(PREFIX, "family table size mismatch"))?;

        let number = |name: &str, default: u64| -> Result<u64, ConfigError> {
            let full = format!("{}_{}", PREFIX, name);
            match var(&full) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|e| ConfigError::invalid(&full, e.to_string())),
                None => Ok(default),
            }
        };

        let timeout_secs = number("HTTP_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid(
                format!("{}_HTTP_TIMEOUT_SECS", PREFIX),
                "timeout must be positive",
            ));
        }
        let max_attempts = number("MAX_ATTEMPTS", 5)?.clamp(1, u32::MAX as u64) as u32;
        let backoff_base_ms = number("BACKOFF_BASE_MS", 500)?;
        let backoff_max_ms = number("BACKOFF_MAX_MS", 30_000)?;
        let acquire_timeout_secs = match var(&format!("{}_ACQUIRE_TIMEOUT_SECS", PREFIX)) {
            Some(_) => Some(number("ACQUIRE_TIMEOUT_SECS", 0)?),
            None => None,
        };
        let user_agent = var(&format!("{}_USER_AGENT", PREFIX)).unwrap_or_else(default_user_agent);

        Ok(Self {
            families,
            user_agent,
            timeout_secs,
            max_attempts,
            backoff_base_ms,
            backoff_max_ms,
            acquire_timeout_secs,
        })
    }

    /// Every family pointed at one host with one signed token; used for
    /// staging hosts and mock servers.
    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| match name {
            "MARKETPLACE_BASE_URL" => Some(base_url.to_string()),
            "MARKETPLACE_API_TOKEN" => Some(token.to_string()),
            _ => None,
        })
    }

    pub fn family(&self, family: ServiceFamily) -> &FamilyConfig {
        &self.families[family.index()]
    }

    pub fn family_mut(&mut self, family: ServiceFamily) -> &mut FamilyConfig {
        &mut self.families[family.index()]
    }

    pub fn quotas(&self) -> impl Iterator<Item = (ServiceFamily, Quota)> + '_ {
        ServiceFamily::ALL
            .into_iter()
            .map(move |f| (f, self.family(f).quota))
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(var, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(var, "scheme must be http or https"));
    }
    Ok(url)
}

fn default_user_agent() -> String {
    format!("marketplace-access/{}", env!("CARGO_PKG_VERSION"))
}
