use crate::app::database_service::DatabaseService;
use crate::domain::model::{Category, ModelRegistry, Product};
use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub db: Arc<DatabaseService>,
}

impl AppState {
    pub fn new(registry: ModelRegistry, db: DatabaseService) -> Self {
        Self {
            registry: Arc::new(registry),
            db: Arc::new(db),
        }
    }
}

/// Body of every 4xx/5xx response produced by the model routes.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ListResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<JsonValue>,
}

/// Entity payload accepted by the model routes (documentation only; routes take raw JSON).
#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
#[allow(dead_code)]
pub enum EntityBody {
    Category(Category),
    Product(Product),
}

fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Parses a JSON request body.
///
/// A body that is empty or not declared as JSON is treated as `{}` and left to
/// schema validation.
pub fn parse_json_body(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<JsonValue, (StatusCode, Json<ErrorBody>)> {
    if !is_json_content(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(format!("Invalid JSON body: {}", e))),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn empty_bodies_are_empty_objects() {
        let json = headers("application/json");
        assert_eq!(parse_json_body(&json, &Bytes::new()).unwrap(), serde_json::json!({}));
        assert_eq!(
            parse_json_body(&json, &Bytes::from_static(b" \n")).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn json_bodies_are_parsed() {
        let body = Bytes::from_static(br#"{"name":"tools"}"#);
        for content_type in [
            "application/json",
            "application/json; charset=utf-8",
            "application/merge-patch+json",
        ] {
            assert_eq!(
                parse_json_body(&headers(content_type), &body).unwrap(),
                serde_json::json!({"name": "tools"})
            );
        }
    }

    #[test]
    fn non_json_content_types_are_ignored() {
        let body = Bytes::from_static(b"name=tools");
        assert_eq!(
            parse_json_body(&headers("text/plain"), &body).unwrap(),
            serde_json::json!({})
        );
        assert_eq!(parse_json_body(&HeaderMap::new(), &body).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn malformed_bodies_are_bad_requests() {
        let (status, Json(body)) =
            parse_json_body(&headers("application/json"), &Bytes::from_static(b"{name:")).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.starts_with("Invalid JSON body"));
    }
}
