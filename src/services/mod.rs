//! Typed façades, one per service family. They only build requests and
//! decode responses; throttling and retries live in [`crate::retry`].

mod ads;
mod analytics;
mod content;
mod feedbacks;
mod marketplace;
mod statistics;

pub use ads::{AdsClient, Campaign, CampaignStats, DayStats};
pub use analytics::{AnalyticsClient, FunnelProduct, StockReportItem};
pub use content::{CardUpdate, ContentClient, PriceUpdate, ProductCard, UploadTask};
pub use feedbacks::{Feedback, FeedbacksClient, Question, UnansweredCount};
pub use marketplace::{MarketplaceClient, Order, Supply};
pub use statistics::{ReportRow, StatisticsClient, StockRow, SupplierOrder};

use crate::error::ApiError;
use crate::http::{decode_json, RawResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// `{"data": ...}` wrapper used by several families.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Decodes `{"data": T}`.
pub(crate) fn decode_data<T: DeserializeOwned>(raw: &RawResponse) -> Result<T, ApiError> {
    decode_json::<Envelope<T>>(raw).map(|e| e.data)
}

/// Decodes a list payload, treating an empty body (204) as no items.
pub(crate) fn decode_list<T: DeserializeOwned>(raw: &RawResponse) -> Result<Vec<T>, ApiError> {
    if raw.body.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_json::<Option<Vec<T>>>(raw).map(Option::unwrap_or_default)
}

/// For write operations whose success body carries nothing useful. A body
/// is still checked for the error envelope.
pub(crate) fn accept(raw: &RawResponse) -> Result<(), ApiError> {
    if raw.body.trim().is_empty() {
        return Ok(());
    }
    decode_json::<Value>(raw).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::json_response;
    use serde_json::json;

    #[test]
    fn empty_list_bodies_are_empty() {
        let mut raw = json_response(204, json!(null));
        raw.body.clear();
        assert!(decode_list::<u32>(&raw).unwrap().is_empty());
        assert!(decode_list::<u32>(&json_response(200, json!(null))).unwrap().is_empty());
        assert_eq!(decode_list::<u32>(&json_response(200, json!([3]))).unwrap(), vec![3]);
    }

    #[test]
    fn accept_still_sees_error_envelope() {
        let mut raw = json_response(204, json!(null));
        raw.body.clear();
        assert!(accept(&raw).is_ok());
        let rejected = json_response(200, json!({"error": true, "errorText": "text too short"}));
        let err = accept(&rejected).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "text too short");
    }
}
