//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    add_image_overlay, add_text_overlay, add_video_overlay, add_watermark, generate_quality,
    get_quality_video, get_result, get_status, get_video, health, list_videos, ready, trim_video,
    upload_video,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, hide_internal_errors, rate_limit_middleware, request_id, request_logging,
    security_headers, RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Endpoints that write files or enqueue work are rate limited per client IP
    let job_routes = Router::new()
        .route("/upload/", post(upload_video))
        .route("/trim/", post(trim_video))
        .route("/overlays/text", post(add_text_overlay))
        .route("/overlays/image", post(add_image_overlay))
        .route("/overlays/video", post(add_video_overlay))
        .route("/watermark", post(add_watermark))
        .route("/quality", post(generate_quality))
        .layer(middleware::from_fn_with_state(
            Arc::new(RateLimiterCache::new(state.config.rate_limit_rps)),
            rate_limit_middleware,
        ));

    let read_routes = Router::new()
        .route("/videos/", get(list_videos))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id/quality/:quality", get(get_quality_video))
        .route("/status/:job_id", get(get_status))
        .route("/result/:job_id", get(get_result));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    let router = Router::new()
        .merge(job_routes)
        .merge(read_routes)
        .merge(health_routes)
        .merge(metrics_routes);

    let router = if state.config.is_production() {
        router.layer(middleware::from_fn(hide_internal_errors))
    } else {
        router
    };

    router
        // Uploads are bounded by MAX_BODY_SIZE instead of axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
