use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::{handlers, jobs, media, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Finished artifacts, served as static files
    let files = ServeDir::new(&state.config().storage.downloads_dir);

    Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Probes (no job)
        .route("/video-info", post(media::video_info))
        .route("/download", get(media::direct_link))
        // Jobs
        .route("/start-download", post(jobs::start_download))
        .route("/status", get(jobs::get_status))
        .nest_service("/files", files)
        // Layers applied innermost-first: metrics, then trace, then CORS outermost
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        // The extension calls from its own origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
