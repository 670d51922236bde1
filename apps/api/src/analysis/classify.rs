//! Error Classifier: maps a pipeline failure to the caller-facing taxonomy.
//!
//! Typed provider errors are mapped on status/reason codes. Untyped failures fall
//! back to matching well-known markers in the message text. Precedence, first match
//! wins: Unauthorized, Forbidden, RateLimited, UpstreamBadResponse, Internal.

use tracing::warn;

use crate::analysis::stages::PipelineError;
use crate::errors::AppError;
use crate::llm_client::GatewayError;

pub const UNAUTHORIZED_MESSAGE: &str =
    "Invalid API key. Please check your API key and try again.";
pub const FORBIDDEN_MESSAGE: &str = "API key access denied. Make sure the Generative Language API \
    is enabled for this key.";
pub const RATE_LIMITED_MESSAGE: &str = "Model rate limit reached. Please wait a minute or \
    supply your own API key.";
pub const BAD_RESPONSE_MESSAGE: &str = "AI returned an invalid response. Please try again.";

const UNAUTHORIZED_MARKERS: &[&str] = &["INVALID_API_KEY", "API_KEY_INVALID"];
const FORBIDDEN_MARKERS: &[&str] = &["API_KEY_FORBIDDEN", "403"];
const RATE_LIMIT_MARKERS: &[&str] = &["RATE_LIMITED", "429", "RESOURCE_EXHAUSTED", "Quota exceeded"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Unauthorized,
    Forbidden,
    RateLimited,
}

/// Category from a typed provider error, if its code identifies one.
fn typed_category(status: u16, reason: Option<&str>) -> Option<Category> {
    match (status, reason) {
        (401, _) | (_, Some("API_KEY_INVALID")) => Some(Category::Unauthorized),
        (403, _) | (_, Some("PERMISSION_DENIED" | "API_KEY_FORBIDDEN")) => {
            Some(Category::Forbidden)
        }
        (429, _) | (_, Some("RESOURCE_EXHAUSTED" | "RATE_LIMIT_EXCEEDED")) => {
            Some(Category::RateLimited)
        }
        _ => None,
    }
}

/// Category from free-form text, for providers without structured codes.
fn textual_category(message: &str) -> Option<Category> {
    let contains_any = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

    if contains_any(UNAUTHORIZED_MARKERS) {
        Some(Category::Unauthorized)
    } else if contains_any(FORBIDDEN_MARKERS) {
        Some(Category::Forbidden)
    } else if contains_any(RATE_LIMIT_MARKERS) {
        Some(Category::RateLimited)
    } else {
        None
    }
}

fn gateway_category(error: &GatewayError) -> Option<Category> {
    match error {
        GatewayError::Api { status, reason, .. } => typed_category(*status, reason.as_deref()),
        untyped => textual_category(&untyped.to_string()),
    }
}

/// Classifies a failure exactly once, at the request boundary.
pub fn classify(error: PipelineError) -> AppError {
    let category = match &error {
        PipelineError::Gateway { source, .. } => gateway_category(source),
        PipelineError::Malformed { .. } | PipelineError::Encode { .. } => None,
    };

    let classified = match (category, &error) {
        (Some(Category::Unauthorized), _) => AppError::Unauthorized(UNAUTHORIZED_MESSAGE.into()),
        (Some(Category::Forbidden), _) => AppError::Forbidden(FORBIDDEN_MESSAGE.into()),
        (Some(Category::RateLimited), _) => AppError::RateLimited(RATE_LIMITED_MESSAGE.into()),
        (None, PipelineError::Malformed { .. }) => {
            AppError::UpstreamBadResponse(BAD_RESPONSE_MESSAGE.into())
        }
        (None, _) => AppError::Internal(anyhow::anyhow!("Analysis failed: {error}")),
    };

    warn!("Pipeline failure classified as {}: {error}", classified.code());
    classified
}
