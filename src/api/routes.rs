use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};
use crate::models::Pagination;

use super::handlers;
use super::identity::{USER_GROUPS_HEADER, USER_ID_HEADER};
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        // Catalogs
        .route("/catalogs/:catalog/search", get(handlers::search))
        .route("/catalogs/:catalog/trending", get(handlers::trending))
        .route("/catalogs/:catalog/recommend", post(handlers::recommend))
        .route("/catalogs/:catalog/details", post(handlers::details))
        // Favorites and ignores
        .route(
            "/registries/:registry",
            post(handlers::add_to_registry).get(handlers::list_registry),
        )
        .route(
            "/registries/:registry/:id",
            delete(handlers::remove_from_registry),
        )
        // Recommend sources
        .route(
            "/sources",
            post(handlers::create_source).get(handlers::list_sources),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(allowed_origins))
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// CORS for the configured origins, exposing the pagination headers to browsers
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_credentials(true)
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_GROUPS_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(Pagination::PAGE_HEADER),
            HeaderName::from_static(Pagination::LIMIT_HEADER),
            HeaderName::from_static(Pagination::PAGE_COUNT_HEADER),
            HeaderName::from_static(Pagination::ITEM_COUNT_HEADER),
        ])
}
