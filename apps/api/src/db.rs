use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::status::{MemoryStatusStore, PgStatusStore, StatusStore};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Postgres-backed store when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_status_store(config: &Config) -> Result<Arc<dyn StatusStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            let store = PgStatusStore::connect(pool).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; status checks are kept in memory");
            Ok(Arc::new(MemoryStatusStore::new()))
        }
    }
}
