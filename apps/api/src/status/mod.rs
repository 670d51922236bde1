//! Status checks: clients record that they reached the service.
//!
//! `AppState` holds an `Arc<dyn StatusStore>`: Postgres when `DATABASE_URL` is
//! set, in-memory (bounded to the newest `LIST_LIMIT` checks) otherwise.

pub mod handlers;

use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::AppError;
use crate::models::status::StatusCheck;

/// Most records returned by `list`.
pub const LIST_LIMIT: usize = 1_000;

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn create(&self, client_name: &str) -> Result<StatusCheck, AppError>;

    /// Oldest first, at most `LIST_LIMIT` records.
    async fn list(&self) -> Result<Vec<StatusCheck>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    /// Wraps the pool and makes sure the table exists.
    pub async fn connect(pool: PgPool) -> Result<Self, AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS status_checks (
                id          UUID PRIMARY KEY,
                client_name TEXT NOT NULL,
                timestamp   TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        info!("status_checks table ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn create(&self, client_name: &str) -> Result<StatusCheck, AppError> {
        let check = StatusCheck::new(client_name);
        sqlx::query("INSERT INTO status_checks (id, client_name, timestamp) VALUES ($1, $2, $3)")
            .bind(check.id)
            .bind(&check.client_name)
            .bind(check.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(check)
    }

    async fn list(&self) -> Result<Vec<StatusCheck>, AppError> {
        let rows = sqlx::query_as::<_, StatusCheck>(
            "SELECT id, client_name, timestamp FROM status_checks ORDER BY timestamp ASC LIMIT $1",
        )
        .bind(LIST_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Holds at most `LIST_LIMIT` checks; once full, each new check evicts the oldest.
pub struct MemoryStatusStore {
    checks: RwLock<VecDeque<StatusCheck>>,
    capacity: usize,
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::with_capacity(LIST_LIMIT)
    }
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            checks: RwLock::new(VecDeque::with_capacity(capacity.min(LIST_LIMIT))),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(&self, client_name: &str) -> Result<StatusCheck, AppError> {
        let check = StatusCheck::new(client_name);
        let mut checks = self.checks.write().await;
        if checks.len() >= self.capacity {
            checks.pop_front();
        }
        checks.push_back(check.clone());
        Ok(check)
    }

    async fn list(&self) -> Result<Vec<StatusCheck>, AppError> {
        let checks = self.checks.read().await;
        Ok(checks.iter().take(LIST_LIMIT).cloned().collect())
    }
}
