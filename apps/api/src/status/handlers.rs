use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::status::{StatusCheck, StatusCheckCreate};
use crate::state::AppState;

/// POST /api/status
pub async fn handle_create_status(
    State(state): State<AppState>,
    Json(req): Json<StatusCheckCreate>,
) -> Result<Json<StatusCheck>, AppError> {
    let client_name = req.client_name.trim();
    if client_name.is_empty() {
        return Err(AppError::Validation("clientName must not be empty".into()));
    }
    let check = state.status_store.create(client_name).await?;
    Ok(Json(check))
}

/// GET /api/status
pub async fn handle_list_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusCheck>>, AppError> {
    Ok(Json(state.status_store.list().await?))
}
