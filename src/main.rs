mod config;
mod error;
mod models;
mod routes;
mod services;
mod storage;
mod utils;

use axum::http::HeaderValue;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::routes::AppState;
use crate::services::llm::LLMClient;
use crate::services::pipeline::GenerationPipeline;
use crate::services::prompt::PromptBuilder;
use crate::storage::{LocalObjectStore, MemoryProjectStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    // Initialize tracing
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env()?);
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; generation requests will fail with a config error");
    }

    // Long-lived clients, shared by every request
    let llm_client = Arc::new(LLMClient::new(&config)?);
    let pipeline = Arc::new(GenerationPipeline::new(PromptBuilder::new(&config), llm_client));
    let objects = Arc::new(LocalObjectStore::new(
        config.storage_dir.clone(),
        config.public_base_url.clone(),
    )?);
    let projects = Arc::new(MemoryProjectStore::new(config.namespace.clone()));

    let app_state = AppState {
        config: config.clone(),
        pipeline,
        objects,
        projects,
    };

    let origin = HeaderValue::from_str(&config.allowed_origin)?;
    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(AllowMethods::any())
                .allow_headers(AllowHeaders::any()),
        );

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        model = %config.model_name,
        max_concurrency = config.max_concurrency,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
