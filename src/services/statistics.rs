use super::decode_list;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{RawResponse, RequestSpec};
use crate::pagination::{PageBody, PageStyle, Paginator};
use crate::types::DateFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const REPORT_MAX_LIMIT: u32 = 100_000;

/// One line of the detailed realization report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRow {
    pub rrd_id: u64,
    pub realizationreport_id: u64,
    pub nm_id: u64,
    pub sa_name: String,
    pub doc_type_name: String,
    pub quantity: i64,
    pub retail_amount: f64,
    pub ppvz_for_pay: f64,
    pub delivery_rub: f64,
    pub penalty: f64,
    pub rr_dt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierOrder {
    pub date: String,
    pub last_change_date: String,
    pub supplier_article: String,
    #[serde(rename = "nmId")]
    pub nm_id: u64,
    pub total_price: f64,
    pub is_cancel: bool,
    pub srid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StockRow {
    pub last_change_date: String,
    pub warehouse_name: String,
    pub supplier_article: String,
    #[serde(rename = "nmId")]
    pub nm_id: u64,
    pub quantity: i64,
    pub in_way_to_client: i64,
    pub in_way_from_client: i64,
}

#[derive(Clone)]
pub struct StatisticsClient {
    client: ApiClient,
}

impl StatisticsClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Detailed report for a period. Pages resume from the last `rrd_id`
    /// seen; a page shorter than `limit` (or an empty 204) ends the report.
    pub fn report_detail_by_period(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> Paginator<ReportRow> {
        let limit = limit.clamp(1, REPORT_MAX_LIMIT);
        let spec = RequestSpec::get(ServiceFamily::Statistics, "/api/v5/supplier/reportDetailByPeriod")
            .query("dateFrom", DateFormat::Rfc3339.format(from))
            .query("dateTo", DateFormat::Rfc3339.format(to))
            .query("rrdid", 0)
            .paginate(PageStyle::cursor_query("rrdid", "limit", limit));
        self.client.pages(
            spec,
            Arc::new(move |raw: &RawResponse| {
                let rows: Vec<ReportRow> = decode_list(raw)?;
                let next = match rows.last() {
                    Some(last) if rows.len() >= limit as usize => Some(last.rrd_id.to_string()),
                    _ => None,
                };
                Ok(PageBody::new(rows).with_next(next))
            }),
        )
    }

    /// Orders changed since `since`.
    pub async fn orders(&self, since: DateTime<Utc>) -> Result<Vec<SupplierOrder>, ApiError> {
        let spec = RequestSpec::get(ServiceFamily::Statistics, "/api/v1/supplier/orders")
            .query("dateFrom", DateFormat::Rfc3339.format(since))
            .query("flag", 0);
        let raw = self.client.perform(&spec).await?;
        decode_list(&raw)
    }

    pub async fn stocks(&self, since: DateTime<Utc>) -> Result<Vec<StockRow>, ApiError> {
        let spec = RequestSpec::get(ServiceFamily::Statistics, "/api/v1/supplier/stocks")
            .query("dateFrom", DateFormat::Rfc3339.format(since));
        let raw = self.client.perform(&spec).await?;
        decode_list(&raw)
    }
}
