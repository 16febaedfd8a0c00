use super::decode_data;
use crate::client::ApiClient;
use crate::family::ServiceFamily;
use crate::http::{RawResponse, RequestSpec};
use crate::pagination::{PageBody, PageStyle, Paginator};
use crate::types::DateFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FunnelProduct {
    pub nm_id: u64,
    pub vendor_code: String,
    pub brand_name: String,
    pub open_card_count: u64,
    pub add_to_cart_count: u64,
    pub orders_count: u64,
    pub orders_sum_rub: f64,
    pub buyouts_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StockReportItem {
    pub nm_id: u64,
    pub vendor_code: String,
    pub subject_name: String,
    pub stock_count: i64,
    pub to_client_count: i64,
    pub from_client_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductsData<T> {
    products: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemsData<T> {
    items: Vec<T>,
}

#[derive(Clone)]
pub struct AnalyticsClient {
    client: ApiClient,
}

impl AnalyticsClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Card-to-order funnel per product; `nm_ids` empty means all products.
    pub fn sales_funnel(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        nm_ids: &[u64],
        limit: u32,
    ) -> Paginator<FunnelProduct> {
        let spec = RequestSpec::post(ServiceFamily::Analytics, "/api/analytics/v3/sales-funnel/products")
            .json(json!({
                "selectedPeriod": period(from, to),
                "nmIds": nm_ids,
            }))
            .paginate(PageStyle::offset_body("offset", "limit", limit.max(1)));
        self.client.pages(
            spec,
            Arc::new(|raw: &RawResponse| {
                let data: ProductsData<FunnelProduct> = decode_data(raw)?;
                Ok(PageBody::new(data.products))
            }),
        )
    }

    pub fn stock_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> Paginator<StockReportItem> {
        let spec = RequestSpec::post(ServiceFamily::Analytics, "/api/v2/stocks-report/products/products")
            .json(json!({
                "currentPeriod": period(from, to),
                "stockType": "",
                "skipDeletedNm": true,
                "orderBy": { "field": "stockCount", "mode": "desc" },
            }))
            .paginate(PageStyle::offset_body("offset", "limit", limit.max(1)));
        self.client.pages(
            spec,
            Arc::new(|raw: &RawResponse| {
                let data: ItemsData<StockReportItem> = decode_data(raw)?;
                Ok(PageBody::new(data.items))
            }),
        )
    }
}

fn period(from: DateTime<Utc>, to: DateTime<Utc>) -> Value {
    json!({
        "start": DateFormat::PlainDate.format(from),
        "end": DateFormat::PlainDate.format(to),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json_response, test_client, ScriptedTransport};
    use chrono::TimeZone;

    #[tokio::test(start_paused = true)]
    async fn funnel_pages_by_body_offset() {
        let transport = ScriptedTransport::from_fn(|req, _| {
            let offset = req.body.as_ref().unwrap()["offset"].as_u64().unwrap();
            let products: Vec<Value> = (offset..5.min(offset + 2)).map(|n| json!({"nmId": n})).collect();
            Ok(json_response(200, json!({"data": {"products": products}})))
        });
        let client = test_client(transport.clone());
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 6, 7, 0, 0, 0).unwrap();
        let rows = client
            .analytics()
            .sales_funnel(from, to, &[], 2)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|r| r.nm_id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        let first = calls[0].body.as_ref().unwrap();
        assert_eq!(first["selectedPeriod"], json!({"start": "2024-06-01", "end": "2024-06-07"}));
        assert_eq!(first["limit"], 2);
        assert_eq!(calls[2].body.as_ref().unwrap()["offset"], 4);
        assert!(calls[0].url.query().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stock_report_reads_items() {
        let transport = ScriptedTransport::sequence(vec![Ok(json_response(
            200,
            json!({"data": {"items": [{"nmId": 8, "stockCount": 12}]}}),
        ))]);
        let client = test_client(transport);
        let now = Utc::now();
        let items = client
            .analytics()
            .stock_report(now, now, 100)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(items, vec![StockReportItem { nm_id: 8, stock_count: 12, ..Default::default() }]);
    }
}
