mod app_state;
mod config;
mod models;
mod routes;
mod services;

use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    credentials::CredentialPool,
    orchestrator::Orchestrator,
    registry::JobRegistry,
    vision::ExtractionGateway,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing invoice-audit server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("extraction_jobs_total", "Total extraction jobs started");
    metrics::describe_counter!("extraction_jobs_completed", "Total extraction jobs completed");
    metrics::describe_counter!("extraction_jobs_failed", "Total extraction jobs that failed");
    metrics::describe_counter!(
        "extraction_jobs_retried",
        "Total jobs re-attempted by a batch retry pass"
    );
    metrics::describe_histogram!(
        "extraction_processing_seconds",
        "Time to run one extraction pipeline"
    );

    // Load provider credentials for round-robin load balancing
    let credentials = Arc::new(CredentialPool::from_env());
    if credentials.is_empty() {
        tracing::warn!(
            "No provider API keys configured; jobs will fail until GEMINI_API_KEY, \
             OPENAI_API_KEY, or ANTHROPIC_API_KEY is set"
        );
    } else {
        tracing::info!(keys = credentials.len(), "Loaded provider API keys");
    }

    // Initialize the extraction gateway
    let gateway = ExtractionGateway::new(
        credentials.clone(),
        Duration::from_secs(config.provider_timeout_secs),
    )
    .expect("Failed to initialize extraction gateway");

    // Job registry and orchestrator
    let registry = Arc::new(JobRegistry::new());
    let orchestrator = Arc::new(Orchestrator::new(registry.clone(), Arc::new(gateway)));

    // Create shared application state
    let state = AppState::new(registry, credentials, orchestrator);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/extract", post(routes::extract::submit_extraction))
        .route("/api/v1/batch-extract", post(routes::extract::submit_batch))
        .route("/api/v1/status/{job_id}", get(routes::extract::get_job_status))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    tracing::info!("Starting invoice-audit on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
