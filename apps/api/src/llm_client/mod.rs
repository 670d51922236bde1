/// LLM Client: the single point of entry for all model calls in the analyzer.
///
/// ARCHITECTURAL RULE: No other module may call the model provider directly.
/// All LLM interactions MUST go through a `ModelGateway`.
///
/// The gateway returns raw text only. Parsing belongs to `extract`.
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod extract;
pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Model used when `LLM_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const MAX_OUTPUT_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status. `reason` is the provider's
    /// machine-readable code when one was present (e.g. `API_KEY_INVALID`).
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("LLM call exceeded the {0}s deadline")]
    DeadlineExceeded(u64),

    #[error("LLM returned empty content")]
    EmptyContent,

    /// Failure from a provider that only reports free-form text.
    #[error("{0}")]
    Provider(String),
}

/// A resolved model credential. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims the raw key; returns `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| ApiKey(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Who said a turn of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "model")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// "Send a system instruction + conversation turns, get text back."
///
/// Each call is independent: implementations keep no history between calls,
/// callers pass all prior turns explicitly. No retries happen at this layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// `turns` ends with the user turn to answer.
    async fn converse(
        &self,
        system_instruction: &str,
        turns: &[ChatTurn],
        credential: &ApiKey,
    ) -> Result<String, GatewayError>;

    /// Single-turn call: one user prompt, no history.
    async fn invoke(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        credential: &ApiKey,
    ) -> Result<String, GatewayError> {
        self.converse(system_instruction, &[ChatTurn::user(user_prompt)], credential)
            .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> Content<'a> {
    fn from_turn(turn: &'a ChatTurn) -> Self {
        let role = match turn.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };
        Content {
            role: Some(role),
            parts: vec![Part {
                text: &turn.content,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Text of the reply, or why there is none. A blocked prompt or a
    /// safety stop is a provider failure; anything else is `EmptyContent`.
    fn into_reply(self) -> Result<String, GatewayError> {
        if let Some(text) = self.text() {
            return Ok(text);
        }
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GatewayError::Provider(format!(
                "prompt blocked by provider: {reason}"
            )));
        }
        match self.candidates.into_iter().next().and_then(|c| c.finish_reason) {
            Some(reason) if reason != "STOP" => Err(GatewayError::Provider(format!(
                "generation stopped by provider: {reason}"
            ))),
            _ => Err(GatewayError::EmptyContent),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    reason: Option<String>,
}

/// Turns a non-2xx body into a typed `GatewayError::Api`.
/// A detail `reason` wins over the coarse `status` string.
fn api_error(status: u16, body: String) -> GatewayError {
    match serde_json::from_str::<ProviderErrorEnvelope>(&body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .details
                .into_iter()
                .find_map(|d| d.reason)
                .or(envelope.error.status);
            GatewayError::Api {
                status,
                reason,
                message: envelope.error.message,
            }
        }
        Err(_) => GatewayError::Api {
            status,
            reason: None,
            message: body,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient: production gateway
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` gateway. The reqwest timeout is the per-call deadline.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    model: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, timeout_secs: u64) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            model: model.into(),
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn converse(
        &self,
        system_instruction: &str,
        turns: &[ChatTurn],
        credential: &ApiKey,
    ) -> Result<String, GatewayError> {
        let request_body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction,
                }],
            },
            contents: turns.iter().map(Content::from_turn).collect(),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::DeadlineExceeded(self.timeout_secs)
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Err(api_error(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "LLM call succeeded: input_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed.into_reply()
    }
}
