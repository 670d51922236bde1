use axum::{extract::State, Json};

use crate::analysis::chat::{resume_chat, ChatReply, ChatRequest};
use crate::analysis::improve::{improve_resume, ImproveRequest, ImprovedResume};
use crate::analysis::models::{AnalysisReport, AnalysisRequest};
use crate::analysis::pipeline::analyze;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/analyze-resume
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    let report = analyze(&state.config, state.gateway.as_ref(), req).await?;
    Ok(Json(report))
}

/// POST /api/improve-resume
pub async fn handle_improve(
    State(state): State<AppState>,
    Json(req): Json<ImproveRequest>,
) -> Result<Json<ImprovedResume>, AppError> {
    let improved = improve_resume(&state.config, state.gateway.as_ref(), req).await?;
    Ok(Json(improved))
}

/// POST /api/resume-chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = resume_chat(&state.config, state.gateway.as_ref(), req).await?;
    Ok(Json(reply))
}
