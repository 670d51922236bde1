//! Résumé chat: answers follow-up questions about an analysis.
//!
//! The résumé, JD and report go into the system instruction; prior turns are
//! sent as real conversation turns. Only the most recent `HISTORY_WINDOW` turns
//! are replayed; anything older is folded into a short summary.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::classify::classify;
use crate::analysis::models::{AnalysisReport, CredentialSelector};
use crate::analysis::pipeline::{resolve_credential, validate_input};
use crate::analysis::prompts::{CHAT_CONTEXT_TEMPLATE, CHAT_SYSTEM, NO_JOB_DESCRIPTION_NOTE};
use crate::analysis::stages::{head, Stage, StageRunner};
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{ChatRole, ChatTurn, ModelGateway};

/// Prior turns replayed verbatim.
pub const HISTORY_WINDOW: usize = 8;
/// Characters kept per turn in the summary of older turns.
const SUMMARY_SNIPPET_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 4_000;

/// POST /api/resume-chat
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub analysis_results: Option<AnalysisReport>,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    #[serde(flatten)]
    pub credential: CredentialSelector,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

fn join_or(items: &[String], separator: &str, fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(separator)
    }
}

/// Stage instruction plus everything the coach should know about this résumé.
pub fn build_chat_system(
    report: &AnalysisReport,
    resume_text: &str,
    job_description: Option<&str>,
) -> String {
    let candidate = match &report.candidate_context {
        Some(c) => format!(
            "- Name: {}\n- Current Role: {}\n- Experience: {}\n- Top Skills: {}",
            c.name,
            c.current_role,
            c.years_experience,
            join_or(&c.top_skills, ", ", "Not specified")
        ),
        None => "Not yet extracted".to_string(),
    };

    let jd_line = match report.jd_match_score {
        Some(score) => format!("- Job Match: {score}/100\n"),
        None => String::new(),
    };
    let scores = format!(
        "- ATS Compatibility: {}/100\n{jd_line}- Structure: {}/100",
        report.ats_score, report.structure_score
    );

    let findings = match &report.key_findings {
        Some(f) => format!(
            "Strong Matches: {}\nCritical Gaps: {}\nQuick Wins: {}",
            join_or(&f.strong_matches, "; ", "None identified"),
            join_or(&f.critical_gaps, "; ", "None identified"),
            join_or(&f.quick_wins, "; ", "None identified")
        ),
        None => "Not yet analyzed".to_string(),
    };

    let priorities = match report.priority_actions.as_deref() {
        Some(actions) if !actions.is_empty() => actions
            .iter()
            .map(|a| {
                let impact = serde_json::to_value(a.impact)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                format!("{}. [{impact}] {}", a.priority, a.action)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "Not yet prioritized".to_string(),
    };

    let suggestions = &report.suggestions;
    let additions = join_or(&suggestions.additions, "; ", "None");
    let removals = join_or(&suggestions.removals, "; ", "None");
    let improvements = join_or(&suggestions.improvements, "; ", "None");

    let context = fill_template(
        CHAT_CONTEXT_TEMPLATE,
        &[
            ("candidate", candidate.as_str()),
            ("scores", scores.as_str()),
            ("findings", findings.as_str()),
            ("priorities", priorities.as_str()),
            ("additions", additions.as_str()),
            ("removals", removals.as_str()),
            ("improvements", improvements.as_str()),
            ("resume_text", resume_text),
            ("job_description", job_description.unwrap_or(NO_JOB_DESCRIPTION_NOTE)),
        ],
    );
    format!("{CHAT_SYSTEM}\n\n{context}")
}

/// Splits history into (summary of older turns, turns to replay).
///
/// Blank turns are dropped. The replayed window never starts with an
/// assistant turn; a leading one moves into the summary instead.
pub fn window_history(history: &[ChatTurn]) -> (Option<String>, Vec<ChatTurn>) {
    let turns: Vec<&ChatTurn> = history
        .iter()
        .filter(|t| !t.content.trim().is_empty())
        .collect();

    let mut split = turns.len().saturating_sub(HISTORY_WINDOW);
    while split < turns.len() && turns[split].role == ChatRole::Assistant {
        split += 1;
    }

    let (older, recent) = turns.split_at(split);
    let summary = (!older.is_empty()).then(|| {
        older
            .iter()
            .map(|t| {
                let role = match t.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                };
                format!("{role}: {}...", head(t.content.trim(), SUMMARY_SNIPPET_CHARS))
            })
            .collect::<Vec<_>>()
            .join("\n")
    });
    (summary, recent.iter().map(|t| (*t).clone()).collect())
}

/// Validate → resolve credential → one multi-turn model call.
pub async fn resume_chat(
    config: &Config,
    gateway: &dyn ModelGateway,
    request: ChatRequest,
) -> Result<ChatReply, AppError> {
    let message = request.message.trim();
    let report = match request.analysis_results.as_ref() {
        Some(report) if !message.is_empty() => report,
        _ => {
            return Err(AppError::Validation(
                "Message, résumé and analysis results are required".to_string(),
            ))
        }
    };
    let message_len = message.chars().count();
    if message_len > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message too long ({message_len} chars). Max {MAX_MESSAGE_CHARS} chars."
        )));
    }
    let input = validate_input(&request.resume_text, request.job_description.as_deref())?;
    let credential = resolve_credential(&request.credential, config)?;

    let (summary, mut turns) = window_history(&request.conversation_history);
    info!(
        "Resume chat: {} prior turns, {} replayed",
        request.conversation_history.len(),
        turns.len()
    );
    turns.push(ChatTurn::user(message));

    let mut system =
        build_chat_system(report, &input.resume_text, input.job_description.as_deref());
    if let Some(summary) = summary {
        system.push_str("\n\n## EARLIER CONVERSATION (summarized):\n");
        system.push_str(&summary);
    }

    let reply = StageRunner::new(gateway, &credential)
        .converse(Stage::Chat, &system, &turns)
        .await
        .map_err(classify)?;

    Ok(ChatReply {
        reply: reply.trim().to_string(),
    })
}
