use crate::api::{handlers, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        // Search surface
        .route("/search", get(handlers::search))
        .route("/api/v2/search", get(handlers::search_api))
        // Project and page ingestion
        .route("/v1/projects/:slug", put(handlers::register_project))
        .route("/v1/projects/:slug", delete(handlers::remove_project))
        .route("/v1/projects/:slug/pages", put(handlers::index_page))
        .route(
            "/v1/projects/:slug/pages/*path",
            delete(handlers::delete_page),
        )
        .route("/v1/reindex", post(handlers::reindex))
        .route("/v1/search/stats", get(handlers::search_stats))
        // Redirect rules and evaluation
        .route("/v1/projects/:slug/redirects", put(handlers::set_redirects))
        .route("/docs/:slug/*path", get(handlers::serve_docs))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
