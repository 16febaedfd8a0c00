use super::accept;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{decode_json, encode_path_segment, RawResponse, RequestSpec};
use crate::pagination::{PageBody, PageStyle, Paginator};
use crate::types::DateFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const ORDERS_MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub rid: String,
    pub created_at: String,
    pub warehouse_id: u64,
    pub nm_id: u64,
    pub chrt_id: u64,
    pub article: String,
    pub price: i64,
    pub converted_price: i64,
    pub supply_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct OrdersPage {
    #[serde(default)]
    next: Option<i64>,
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Clone)]
pub struct MarketplaceClient {
    client: ApiClient,
}

impl MarketplaceClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Assembly orders in a window, following the server's `next` marker.
    /// `limit` is clamped to 1..=1000.
    pub fn list_orders(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> Paginator<Order> {
        let spec = RequestSpec::get(ServiceFamily::Marketplace, "/api/v3/orders")
            .query("dateFrom", DateFormat::UnixSeconds.format(from))
            .query("dateTo", DateFormat::UnixSeconds.format(to))
            .query("next", 0)
            .paginate(PageStyle::cursor_query(
                "next",
                "limit",
                limit.clamp(1, ORDERS_MAX_LIMIT),
            ));
        self.client.pages(
            spec,
            Arc::new(|raw: &RawResponse| {
                let page: OrdersPage = decode_json(raw)?;
                let next = page.next.filter(|n| *n > 0).map(|n| n.to_string());
                Ok(PageBody::new(page.orders).with_next(next))
            }),
        )
    }

    pub async fn new_orders(&self) -> Result<Vec<Order>, ApiError> {
        let spec = RequestSpec::get(ServiceFamily::Marketplace, "/api/v3/orders/new");
        let page: OrdersPage = self.client.perform_json(&spec).await?;
        Ok(page.orders)
    }

    pub async fn create_supply(&self, name: &str) -> Result<Supply, ApiError> {
        let spec = RequestSpec::post(ServiceFamily::Marketplace, "/api/v3/supplies")
            .json(json!({ "name": name }));
        self.client.perform_json(&spec).await
    }

    pub async fn add_order_to_supply(&self, supply_id: &str, order_id: u64) -> Result<(), ApiError> {
        let path = format!(
            "/api/v3/supplies/{}/orders/{}",
            encode_path_segment(supply_id),
            order_id
        );
        let raw = self
            .client
            .perform(&RequestSpec::patch(ServiceFamily::Marketplace, path))
            .await?;
        accept(&raw)
    }
}
