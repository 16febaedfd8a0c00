use super::{accept, decode_data};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::family::ServiceFamily;
use crate::http::{request_id_from_headers, RawResponse, RequestSpec};
use crate::pagination::{PageBody, PageStyle, Paginator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const TAKE_MAX: u32 = 5000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub text: String,
    pub product_valuation: u8,
    pub created_date: String,
    pub user_name: String,
    pub answer: Option<Value>,
    pub product_details: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub created_date: String,
    pub state: String,
    pub answer: Option<Value>,
    pub product_details: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnansweredCount {
    pub count_unanswered: u64,
    pub count_unanswered_today: u64,
    pub valuation: String,
}

#[derive(Clone)]
pub struct FeedbacksClient {
    client: ApiClient,
}

impl FeedbacksClient {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Reviews, newest first, paged with `take`/`skip`.
    pub fn list_feedbacks(&self, answered: bool, take: u32) -> Paginator<Feedback> {
        self.listing("/api/v1/feedbacks", "feedbacks", answered, take)
    }

    pub fn list_questions(&self, answered: bool, take: u32) -> Paginator<Question> {
        self.listing("/api/v1/questions", "questions", answered, take)
    }

    pub async fn answer_feedback(&self, id: &str, text: &str) -> Result<(), ApiError> {
        let spec = RequestSpec::post(ServiceFamily::Feedbacks, "/api/v1/feedbacks/answer")
            .json(json!({ "id": id, "text": text }));
        let raw = self.client.perform(&spec).await?;
        accept(&raw)
    }

    pub async fn answer_question(&self, id: &str, text: &str) -> Result<(), ApiError> {
        let spec = RequestSpec::patch(ServiceFamily::Feedbacks, "/api/v1/questions").json(json!({
            "id": id,
            "answer": { "text": text },
            "state": "wbRu",
        }));
        let raw = self.client.perform(&spec).await?;
        accept(&raw)
    }

    pub async fn unanswered_count(&self) -> Result<UnansweredCount, ApiError> {
        let spec = RequestSpec::get(ServiceFamily::Feedbacks, "/api/v1/feedbacks/count-unanswered");
        let raw = self.client.perform(&spec).await?;
        decode_data(&raw)
    }

    fn listing<T>(&self, path: &str, field: &'static str, answered: bool, take: u32) -> Paginator<T>
    where
        T: DeserializeOwned + 'static,
    {
        let spec = RequestSpec::get(ServiceFamily::Feedbacks, path)
            .query("isAnswered", answered)
            .query("order", "dateDesc")
            .paginate(PageStyle::offset_query("skip", "take", take.clamp(1, TAKE_MAX)));
        self.client.pages(
            spec,
            Arc::new(move |raw: &RawResponse| {
                let mut data: Value = decode_data(raw)?;
                let items = match data.get_mut(field).map(Value::take) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(list) => serde_json::from_value(list).map_err(|e| {
                        ApiError::decode(
                            format!("unexpected {} payload: {}", field, e),
                            request_id_from_headers(&raw.headers),
                        )
                    })?,
                };
                Ok(PageBody::new(items))
            }),
        )
    }
}
