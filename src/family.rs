use crate::rate_limit::Quota;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The six independently throttled REST API families of the marketplace platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceFamily {
    Statistics,
    Marketplace,
    Content,
    Feedbacks,
    Analytics,
    Ads,
}

impl ServiceFamily {
    pub const ALL: [ServiceFamily; 6] = [
        ServiceFamily::Statistics,
        ServiceFamily::Marketplace,
        ServiceFamily::Content,
        ServiceFamily::Feedbacks,
        ServiceFamily::Analytics,
        ServiceFamily::Ads,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceFamily::Statistics => "statistics",
            ServiceFamily::Marketplace => "marketplace",
            ServiceFamily::Content => "content",
            ServiceFamily::Feedbacks => "feedbacks",
            ServiceFamily::Analytics => "analytics",
            ServiceFamily::Ads => "ads",
        }
    }

    /// Upper-case infix used in per-family environment variables,
    /// e.g. `MARKETPLACE_FEEDBACKS_TOKEN`.
    pub fn env_key(self) -> &'static str {
        match self {
            ServiceFamily::Statistics => "STATISTICS",
            ServiceFamily::Marketplace => "MARKETPLACE",
            ServiceFamily::Content => "CONTENT",
            ServiceFamily::Feedbacks => "FEEDBACKS",
            ServiceFamily::Analytics => "ANALYTICS",
            ServiceFamily::Ads => "ADS",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ServiceFamily::Statistics => "https://statistics-api.wildberries.ru",
            ServiceFamily::Marketplace => "https://marketplace-api.wildberries.ru",
            ServiceFamily::Content => "https://content-api.wildberries.ru",
            ServiceFamily::Feedbacks => "https://feedbacks-api.wildberries.ru",
            ServiceFamily::Analytics => "https://seller-analytics-api.wildberries.ru",
            ServiceFamily::Ads => "https://advert-api.wildberries.ru",
        }
    }

    /// Published quota at the time of writing. Override with
    /// `MARKETPLACE_<FAMILY>_QUOTA` when the platform revises it.
    pub fn default_quota(self) -> Quota {
        const MINUTE: Duration = Duration::from_secs(60);
        const DAY: Duration = Duration::from_secs(24 * 60 * 60);
        match self {
            ServiceFamily::Statistics => Quota::new(60, MINUTE),
            ServiceFamily::Marketplace => Quota::new(300, MINUTE),
            ServiceFamily::Content => Quota::new(100, MINUTE),
            ServiceFamily::Feedbacks => Quota::new(1000, DAY),
            ServiceFamily::Analytics => Quota::new(300, MINUTE),
            ServiceFamily::Ads => Quota::new(100, MINUTE),
        }
    }
}

impl fmt::Display for ServiceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ServiceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ServiceFamily::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown service family: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Feedbacks".parse::<ServiceFamily>(), Ok(ServiceFamily::Feedbacks));
        assert_eq!(" ads ".parse::<ServiceFamily>(), Ok(ServiceFamily::Ads));
        assert!("promo".parse::<ServiceFamily>().is_err());
    }

    #[test]
    fn feedbacks_quota_is_daily() {
        let q = ServiceFamily::Feedbacks.default_quota();
        assert_eq!(q.capacity, 1000);
        assert_eq!(q.window, Duration::from_secs(86_400));
    }
}
