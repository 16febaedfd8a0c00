use crate::error::{ApiError, ErrorKind};
use crate::family::ServiceFamily;
use crate::pagination::{unpack_cursor, PageStyle, PaginationCursor, Placement};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

/// Everything needed to issue one call. Built once, then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub family: ServiceFamily,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub pagination: PageStyle,
}

impl RequestSpec {
    pub fn new(family: ServiceFamily, method: Method, path: impl Into<String>) -> Self {
        Self {
            family,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            pagination: PageStyle::None,
        }
    }

    pub fn get(family: ServiceFamily, path: impl Into<String>) -> Self {
        Self::new(family, Method::GET, path)
    }

    pub fn post(family: ServiceFamily, path: impl Into<String>) -> Self {
        Self::new(family, Method::POST, path)
    }

    pub fn patch(family: ServiceFamily, path: impl Into<String>) -> Self {
        Self::new(family, Method::PATCH, path)
    }

    /// Sets a query parameter, replacing an earlier value for the same key.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.set_query(key, value.to_string());
        self
    }

    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn paginate(mut self, style: PageStyle) -> Self {
        self.pagination = style;
        self
    }

    pub fn url(&self, base: &Url) -> Result<Url, ApiError> {
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), self.path);
        let mut url = Url::parse(&joined).map_err(|e| {
            ApiError::new(ErrorKind::Validation, format!("bad request url {}: {}", joined, e))
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// The request for one page: limit and cursor applied where the style places them.
    pub fn for_page(&self, cursor: Option<&PaginationCursor>) -> Result<RequestSpec, ApiError> {
        let mut spec = self.clone();
        match &self.pagination {
            PageStyle::None => {}
            PageStyle::OffsetLimit {
                offset_key,
                limit_key,
                limit,
                placement,
            } => {
                let (offset, limit) = match cursor {
                    Some(PaginationCursor::Offset { offset, limit }) => (*offset, *limit),
                    Some(PaginationCursor::Next { .. }) => {
                        return Err(ApiError::new(
                            ErrorKind::Validation,
                            "token cursor given to an offset-paged listing",
                        ))
                    }
                    None => (0, *limit),
                };
                spec.place(*placement, limit_key, Value::from(limit));
                spec.place(*placement, offset_key, Value::from(offset));
            }
            PageStyle::Cursor {
                cursor_key,
                limit_key,
                limit,
                placement,
                packed,
            } => {
                spec.place(*placement, limit_key, Value::from(*limit));
                match cursor {
                    None => {}
                    Some(PaginationCursor::Next { token }) if *packed => {
                        let fields = unpack_cursor(token).ok_or_else(|| {
                            ApiError::new(ErrorKind::Validation, "malformed pagination cursor")
                        })?;
                        spec.place(*placement, cursor_key, fields);
                    }
                    Some(PaginationCursor::Next { token }) => {
                        spec.place(*placement, cursor_key, Value::from(token.clone()));
                    }
                    Some(PaginationCursor::Offset { .. }) => {
                        return Err(ApiError::new(
                            ErrorKind::Validation,
                            "offset cursor given to a token-paged listing",
                        ))
                    }
                }
            }
        }
        Ok(spec)
    }

    fn set_query(&mut self, key: &str, value: String) {
        self.query.retain(|(k, _)| k != key);
        self.query.push((key.to_string(), value));
    }

    fn place(&mut self, placement: Placement, key: &str, value: Value) {
        match placement {
            Placement::Query => {
                let rendered = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.set_query(key, rendered);
            }
            Placement::Body => {
                let body = self.body.get_or_insert_with(|| Value::Object(Map::new()));
                set_body_field(body, key, value);
            }
        }
    }
}

/// Writes `value` at a dotted path, creating objects on the way. Objects
/// written onto an existing object are merged key by key.
pub fn set_body_field(body: &mut Value, dotted: &str, value: Value) {
    let mut node = body;
    for part in dotted.split('.') {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else { return };
        node = map.entry(part.to_string()).or_insert(Value::Null);
    }
    match (node, value) {
        (Value::Object(existing), Value::Object(incoming)) => existing.extend(incoming),
        (slot, value) => *slot = value,
    }
}
