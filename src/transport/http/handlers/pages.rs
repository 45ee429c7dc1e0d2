//! Non-API routes: homepage, 404 page, and the internal-error responses.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::any::Any;

pub const HOMEPAGE: &str = "<h2>Homepage</h2>";
pub const NOT_FOUND_PAGE: &str = "<h2>404 Page Not Found</h2>";
pub const INTERNAL_ERROR_PAGE: &str = "<h2>500 Internal Server Error</h2>";

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Homepage HTML", body = String, content_type = "text/html"))
)]
pub async fn homepage_handler() -> Html<&'static str> {
    Html(HOMEPAGE)
}

pub async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(INTERNAL_ERROR_PAGE)).into_response()
}

#[utoipa::path(
    get,
    path = "/error-thrown",
    responses((status = 500, description = "Internal error", body = String, content_type = "text/html"))
)]
pub async fn error_thrown_handler() -> Response {
    tracing::error!("Error: Internal Error");
    internal_error()
}

/// Converts a handler panic into a 500 response.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(%detail, "request handler panicked");
    internal_error()
}
