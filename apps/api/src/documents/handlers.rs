use axum::{extract::Multipart, Json};
use serde::Serialize;

use crate::documents::extract_text;
use crate::errors::AppError;

#[derive(Debug, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub characters: usize,
}

/// POST /api/extract-text
pub async fn handle_extract_text(mut multipart: Multipart) -> Result<Json<ExtractedText>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let text = extract_text(file_name.as_deref(), data).await?;
        let characters = text.chars().count();
        return Ok(Json(ExtractedText { text, characters }));
    }

    Err(AppError::Validation("Missing `file` field in upload".into()))
}
