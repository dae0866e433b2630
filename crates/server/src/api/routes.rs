use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{convert, formats, handlers, middleware::metrics_middleware};
use crate::state::AppState;

/// Builds the application router.
///
/// `max_upload_bytes` caps the request body of the convert endpoint.
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Capability discovery
        .route("/formats", get(formats::list_formats))
        .route("/formats/{input_format}", get(formats::list_targets))
        // Conversion
        .route(
            "/convert",
            post(convert::convert_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
