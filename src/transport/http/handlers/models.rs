//! Generic `/api/v1/{model}` routes.
//!
//! Each request resolves its model token, makes exactly one adapter call, and
//! maps the result: `NotFound` → 404 (empty), client errors → 400, store
//! failures → 500.

use crate::domain::model::{CrudModel, ModelError, Outcome};
use crate::transport::http::types::{parse_json_body, AppState, EntityBody, ErrorBody, ListResponse};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as JsonValue;

fn resolve<'a>(state: &'a AppState, model: &str) -> Result<&'a dyn CrudModel, Response> {
    state.registry.resolve(model).map_err(|e| {
        tracing::debug!(error = %e, "unknown model token");
        StatusCode::NOT_FOUND.into_response()
    })
}

fn error_response(err: &ModelError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorBody::new(err))).into_response()
}

fn outcome_response(outcome: Outcome<JsonValue>) -> Response {
    match outcome {
        Outcome::Found(entity) => (StatusCode::OK, Json(entity)).into_response(),
        Outcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        Outcome::Failed(err) => error_response(&err),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/{model}",
    params(
        ("model" = String, Path, description = "Model name (categories or products)")
    ),
    responses(
        (status = 200, description = "Every record of the model", body = ListResponse),
        (status = 404, description = "Unknown model or read failure", body = ErrorBody)
    )
)]
pub async fn list_handler(State(state): State<AppState>, Path(model): Path<String>) -> Response {
    let model = match resolve(&state, &model) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match model.read().await {
        Ok(results) => (
            StatusCode::OK,
            Json(ListResponse {
                count: results.len(),
                results,
            }),
        )
            .into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(ErrorBody::new(e))).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name (categories or products)"),
        ("id" = String, Path, description = "Record id (24 hex characters)")
    ),
    responses(
        (status = 200, description = "The record", body = EntityBody),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such record (empty body)")
    )
)]
pub async fn read_one_handler(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    let model = match resolve(&state, &model) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    outcome_response(model.read_one(&id).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/{model}",
    params(
        ("model" = String, Path, description = "Model name (categories or products)")
    ),
    request_body = EntityBody,
    responses(
        (status = 200, description = "The newly created record", body = EntityBody),
        (status = 400, description = "Validation failed or invalid JSON", body = ErrorBody),
        (status = 404, description = "Unknown model"),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn create_handler(
    State(state): State<AppState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let model = match resolve(&state, &model) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let record = match parse_json_body(&headers, &body) {
        Ok(v) => v,
        Err(resp) => return resp.into_response(),
    };

    match model.create(record).await {
        Ok(entity) => (StatusCode::OK, Json(entity)).into_response(),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name (categories or products)"),
        ("id" = String, Path, description = "Record id (24 hex characters)")
    ),
    request_body = EntityBody,
    responses(
        (status = 200, description = "The record after the update", body = EntityBody),
        (status = 400, description = "Malformed id, validation failed or invalid JSON", body = ErrorBody),
        (status = 404, description = "No such record (empty body)"),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let model = match resolve(&state, &model) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let patch = match parse_json_body(&headers, &body) {
        Ok(v) => v,
        Err(resp) => return resp.into_response(),
    };
    outcome_response(model.update(&id, patch).await)
}

#[utoipa::path(
    delete,
    path = "/api/v1/{model}/{id}",
    params(
        ("model" = String, Path, description = "Model name (categories or products)"),
        ("id" = String, Path, description = "Record id (24 hex characters)")
    ),
    responses(
        (status = 200, description = "The record as it was before deletion", body = EntityBody),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such record (empty body)"),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    let model = match resolve(&state, &model) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    outcome_response(model.delete(&id).await)
}
