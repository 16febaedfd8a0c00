use super::decode_list;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{decode_json, RawResponse, RequestSpec};
use crate::pagination::{PageBody, PageStyle, Paginator};
use crate::types::DateFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Campaign {
    pub advert_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i32,
    pub status: i32,
    pub daily_budget: u64,
    pub create_time: String,
    pub change_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CampaignStats {
    pub advert_id: u64,
    pub views: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub sum: f64,
    pub orders: u64,
    pub days: Vec<DayStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayStats {
    pub date: String,
    pub views: u64,
    pub clicks: u64,
    pub sum: f64,
    pub orders: u64,
}

#[derive(Clone)]
pub struct AdsClient {
    client: ApiClient,
}

impl AdsClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Campaigns, optionally filtered by status, paged with offset/limit.
    pub fn list_campaigns(&self, status: Option<i32>, limit: u32) -> Paginator<Campaign> {
        let spec = RequestSpec::get(ServiceFamily::Ads, "/adv/v1/promotion/adverts")
            .query_opt("status", status)
            .query("order", "change")
            .query("direction", "desc")
            .paginate(PageStyle::offset_query("offset", "limit", limit.max(1)));
        self.client.pages(
            spec,
            Arc::new(|raw: &RawResponse| Ok(PageBody::new(decode_list(raw)?))),
        )
    }

    /// Full statistics for up to 100 campaigns over a date range.
    pub async fn campaign_stats(
        &self,
        ids: &[u64],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CampaignStats>, ApiError> {
        let interval = json!({
            "begin": DateFormat::PlainDate.format(from),
            "end": DateFormat::PlainDate.format(to),
        });
        let body: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id, "interval": interval }))
            .collect();
        let spec = RequestSpec::post(ServiceFamily::Ads, "/adv/v2/fullstats").json(json!(body));
        let raw = self.client.perform(&spec).await?;
        decode_list(&raw)
    }

    /// Creates an auction campaign for the given products; returns its id.
    pub async fn create_campaign(&self, name: &str, nm_ids: &[u64]) -> Result<u64, ApiError> {
        let spec = RequestSpec::post(ServiceFamily::Ads, "/adv/v2/seacat/save-ad")
            .json(json!({ "campaignName": name, "nms": nm_ids }));
        let raw = self.client.perform(&spec).await?;
        decode_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{json_response, test_client, ScriptedTransport};
    use chrono::TimeZone;

    #[tokio::test(start_paused = true)]
    async fn campaigns_page_by_query_offset() {
        let transport = ScriptedTransport::from_fn(|req, _| {
            let offset = req
                .url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .map(|(_, v)| v.into_owned());
            let body = match offset.as_deref() {
                Some("0") => json!([{"advertId": 1, "type": 8}, {"advertId": 2, "type": 9}]),
                _ => json!([]),
            };
            Ok(json_response(200, body))
        });
        let client = test_client(transport.clone());
        let campaigns = client
            .ads()
            .list_campaigns(Some(9), 2)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[1].kind, 9);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].url.query().unwrap().contains("status=9"));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_send_plain_dates() {
        let transport = ScriptedTransport::sequence(vec![Ok(json_response(
            200,
            json!([{"advertId": 5, "views": 100, "clicks": 7, "days": [{"date": "2024-02-01", "views": 100}]}]),
        ))]);
        let client = test_client(transport.clone());
        let from = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 3, 12, 0, 0).unwrap();
        let stats = client.ads().campaign_stats(&[5], from, to).await.unwrap();
        assert_eq!(stats[0].clicks, 7);
        assert_eq!(stats[0].days[0].date, "2024-02-01");
        assert_eq!(
            transport.calls()[0].body,
            Some(json!([{"id": 5, "interval": {"begin": "2024-02-01", "end": "2024-02-03"}}]))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_campaign_rejects_non_numeric_id() {
        let transport = ScriptedTransport::sequence(vec![
            Ok(json_response(200, json!(123456))),
            Ok(json_response(200, json!({"id": "oops"}))),
        ]);
        let ads = test_client(transport).ads();
        assert_eq!(ads.create_campaign("summer", &[1, 2]).await.unwrap(), 123456);
        let err = ads.create_campaign("summer", &[1, 2]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
