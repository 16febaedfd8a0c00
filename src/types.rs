use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Rate metadata reported by the platform alongside responses.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RateMeta {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Seconds until the server-side window resets.
    pub reset_secs: Option<u64>,
    /// Seconds the server asks to wait before the next call.
    pub retry_secs: Option<u64>,
}

impl RateMeta {
    /// Window exhausted on the server side: freeze locally until it resets.
    pub fn exhausted_for(&self) -> Option<u64> {
        match (self.remaining, self.reset_secs) {
            (Some(0), Some(reset)) if reset > 0 => Some(reset),
            _ => None,
        }
    }
}

/// Outgoing date encodings; each endpoint accepts exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYY-MM-DDTHH:MM:SSZ`
    Rfc3339,
    /// `YYYY-MM-DD`
    PlainDate,
    UnixSeconds,
}

impl DateFormat {
    pub fn format(self, at: DateTime<Utc>) -> String {
        match self {
            DateFormat::Rfc3339 => at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            DateFormat::PlainDate => at.format("%Y-%m-%d").to_string(),
            DateFormat::UnixSeconds => at.timestamp().to_string(),
        }
    }
}
