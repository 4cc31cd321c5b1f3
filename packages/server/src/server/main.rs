// Main entry point for the website-analysis API server

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use server_core::scraping::{AnalysisPipeline, InMemoryJobStore, JobTracker};
use server_core::server::{build_app, AppState};
use server_core::Config;
use site_crawler::{BrowserManager, ChromeFetcher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,site_crawler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting website analysis API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let allowed_origin = config
        .allowed_origin
        .as_deref()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .context("ALLOWED_ORIGIN is not a valid header value")
        })
        .transpose()?;

    // Wire up the pipeline: shared browser, page fetcher, AI gateway
    let browser_manager = BrowserManager::new(config.browser_headless);
    let fetcher = Arc::new(ChromeFetcher::new(browser_manager));
    let gateway = Arc::new(ai_gateway::OpenAiGateway::new(config.openai_api_key.clone()));
    let pipeline = Arc::new(AnalysisPipeline::new(
        gateway,
        fetcher,
        config.openai_model.clone(),
    ));
    let tracker = Arc::new(JobTracker::new(
        Arc::new(InMemoryJobStore::new()),
        pipeline,
    ));

    let app = build_app(AppState { tracker }, allowed_origin);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
