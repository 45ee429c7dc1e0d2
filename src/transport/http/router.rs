use crate::transport::http::handlers::{health, models, pages};
use crate::transport::http::types::{AppState, EntityBody, ErrorBody, ListResponse};
use crate::domain::model::{Category, CategoryPatch, Product, ProductPatch};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        pages::homepage_handler,
        pages::error_thrown_handler,
        health::healthcheck_handler,
        models::list_handler,
        models::read_one_handler,
        models::create_handler,
        models::update_handler,
        models::delete_handler
    ),
    components(schemas(
        ErrorBody,
        ListResponse,
        EntityBody,
        Category,
        CategoryPatch,
        Product,
        ProductPatch
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

/// API and page routes bound to the shared state.
///
/// Every method router falls back to the 404 page, so a known path with an
/// unrouted method is a 404 rather than a 405.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(pages::homepage_handler).fallback(pages::not_found_handler),
        )
        .route(
            "/error-thrown",
            get(pages::error_thrown_handler).fallback(pages::not_found_handler),
        )
        .route(
            "/health",
            get(health::healthcheck_handler).fallback(pages::not_found_handler),
        )
        .route(
            "/api/v1/:model",
            get(models::list_handler)
                .post(models::create_handler)
                .fallback(pages::not_found_handler),
        )
        .route(
            "/api/v1/:model/:id",
            get(models::read_one_handler)
                .put(models::update_handler)
                .delete(models::delete_handler)
                .fallback(pages::not_found_handler),
        )
        .with_state(app_state)
}

/// The full service: routes, API docs, 404 fallback, and middleware.
pub fn build_app(app_state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(pages::not_found_handler)
        .layer(CatchPanicLayer::custom(pages::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
