use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelGateway;
use crate::status::StatusStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Model Gateway. Default: GeminiClient; tests inject a scripted gateway.
    pub gateway: Arc<dyn ModelGateway>,
    /// Postgres-backed when DATABASE_URL is set, in-memory otherwise.
    pub status_store: Arc<dyn StatusStore>,
}
