mod analysis;
mod config;
mod db;
mod documents;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod status;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::build_status_store;
use crate::llm_client::GeminiClient;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    if config.shared_llm_api_key.is_none() {
        warn!("SHARED_LLM_API_KEY not set; only requests with their own API key will succeed");
    }

    let gateway = GeminiClient::new(config.llm_model.clone(), config.llm_timeout_secs)?;
    info!(
        "Model gateway initialized (model: {}, timeout: {}s)",
        gateway.model(),
        config.llm_timeout_secs
    );

    let status_store = build_status_store(&config).await?;

    let state = AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        status_store,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
