use super::{accept, decode_data};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{decode_json, RawResponse, RequestSpec};
use crate::pagination::{pack_cursor, PageBody, PageStyle, Paginator, Placement};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const CARDS_MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    #[serde(rename = "imtID")]
    pub imt_id: u64,
    pub vendor_code: String,
    pub brand: String,
    pub title: String,
    pub subject_name: String,
    pub updated_at: String,
}

/// Fields to overwrite on an existing card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    pub vendor_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub characteristics: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    #[serde(rename = "nmID")]
    pub nm_id: u64,
    pub price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadTask {
    pub id: u64,
    pub already_exists: bool,
}

#[derive(Debug, Deserialize)]
struct CardsPage {
    #[serde(default)]
    cards: Vec<ProductCard>,
    #[serde(default)]
    cursor: CardsCursor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CardsCursor {
    updated_at: Option<String>,
    #[serde(rename = "nmID")]
    nm_id: Option<u64>,
    total: u64,
}

#[derive(Clone)]
pub struct ContentClient {
    client: ApiClient,
}

impl ContentClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Product cards, newest first. The composite `updatedAt`/`nmID` cursor
    /// is carried between pages as one opaque token.
    pub fn list_cards(&self, limit: u32, with_photo: Option<bool>) -> Paginator<ProductCard> {
        let limit = limit.clamp(1, CARDS_MAX_LIMIT);
        let photo = match with_photo {
            None => -1,
            Some(false) => 0,
            Some(true) => 1,
        };
        let spec = RequestSpec::post(ServiceFamily::Content, "/content/v2/get/cards/list")
            .json(json!({ "settings": { "filter": { "withPhoto": photo } } }))
            .paginate(PageStyle::Cursor {
                cursor_key: "settings.cursor".into(),
                limit_key: "settings.cursor.limit".into(),
                limit,
                placement: Placement::Body,
                packed: true,
            });
        self.client.pages(
            spec,
            Arc::new(move |raw: &RawResponse| {
                let page: CardsPage = decode_json(raw)?;
                let c = page.cursor;
                let next = match (c.updated_at, c.nm_id) {
                    (Some(updated_at), Some(nm_id)) if c.total >= limit as u64 => {
                        Some(pack_cursor(&json!({ "updatedAt": updated_at, "nmID": nm_id })))
                    }
                    _ => None,
                };
                Ok(PageBody::new(page.cards).with_next(next))
            }),
        )
    }

    pub async fn update_cards(&self, cards: &[CardUpdate]) -> Result<(), ApiError> {
        let spec = RequestSpec::post(ServiceFamily::Content, "/content/v2/cards/update")
            .json(json!(cards));
        let raw = self.client.perform(&spec).await?;
        accept(&raw)
    }

    /// Queues a price/discount upload; the task is processed asynchronously.
    pub async fn upload_prices(&self, prices: &[PriceUpdate]) -> Result<UploadTask, ApiError> {
        let spec = RequestSpec::post(ServiceFamily::Content, "/api/v2/upload/task")
            .json(json!({ "data": prices }));
        let raw = self.client.perform(&spec).await?;
        decode_data(&raw)
    }
}
