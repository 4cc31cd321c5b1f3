//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::scraping::JobTracker;
use crate::server::routes::{analyze_website, health_handler, job_status};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<JobTracker>,
}

/// Build the Axum application router
pub fn build_app(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
    };

    Router::new()
        .route("/web-scraping/analyze-website", post(analyze_website))
        .route("/web-scraping/job-status/:job_id", get(job_status))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
