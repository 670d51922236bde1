//! Résumé improvement: rewrites a résumé from report suggestions, then rescores it.
//!
//! The rewrite is required; the rescore is best-effort and never fails the request.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::classify::classify;
use crate::analysis::models::{optional_score, score, CredentialSelector, Suggestions};
use crate::analysis::pipeline::{resolve_credential, validate_input, AnalysisInput};
use crate::analysis::prompts::{
    IMPROVE_TEMPLATE, PRESERVE_STRUCTURE_TASK, RESCORE_TEMPLATE, REWRITE_TASK,
};
use crate::analysis::stages::{Stage, StageRunner};
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, JSON_ONLY_INSTRUCTION};
use crate::llm_client::ModelGateway;

/// Suggestions as either a flat list or a report's suggestions block.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SuggestionInput {
    List(Vec<String>),
    Grouped(Suggestions),
}

impl Default for SuggestionInput {
    fn default() -> Self {
        SuggestionInput::List(Vec::new())
    }
}

impl SuggestionInput {
    /// Flattened suggestions to apply. Removals are not rewritten in.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            SuggestionInput::List(items) => items.clone(),
            SuggestionInput::Grouped(s) => s
                .additions
                .iter()
                .chain(&s.improvements)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormattingNotes {
    #[serde(default)]
    pub formatting: Vec<String>,
}

/// POST /api/improve-resume
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveRequest {
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub suggestions: SuggestionInput,
    #[serde(default)]
    pub structure_analysis: Option<FormattingNotes>,
    #[serde(default)]
    pub preserve_structure: bool,
    #[serde(flatten)]
    pub credential: CredentialSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeScores {
    #[serde(deserialize_with = "score")]
    pub ats_score: u8,
    #[serde(
        default,
        deserialize_with = "optional_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub jd_match_score: Option<u8>,
    #[serde(deserialize_with = "score")]
    pub structure_score: u8,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedResume {
    pub improved_resume: String,
    pub scores: Option<ResumeScores>,
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_improve_prompt(
    input: &AnalysisInput,
    suggestions: &[String],
    formatting: &[String],
    preserve_structure: bool,
) -> String {
    let target = match &input.job_description {
        Some(jd) => format!("## TARGET JOB DESCRIPTION:\n{jd}"),
        None => "## NOTE: No job description provided. Focus on general ATS optimization."
            .to_string(),
    };
    let suggestions = if suggestions.is_empty() {
        "(none provided; apply general best practices)".to_string()
    } else {
        numbered(suggestions)
    };
    let formatting = if formatting.is_empty() {
        String::new()
    } else {
        format!("\n## FORMATTING RECOMMENDATIONS:\n{}\n", numbered(formatting))
    };
    let task = if preserve_structure {
        PRESERVE_STRUCTURE_TASK
    } else {
        REWRITE_TASK
    };

    fill_template(
        IMPROVE_TEMPLATE,
        &[
            ("resume_text", input.resume_text.as_str()),
            ("target", target.as_str()),
            ("suggestions", suggestions.as_str()),
            ("formatting", formatting.as_str()),
            ("task", task),
        ],
    )
}

fn build_rescore_prompt(improved: &str, job_description: Option<&str>) -> String {
    let job_section = job_description
        .map(|jd| format!("\n## JOB DESCRIPTION:\n{jd}\n"))
        .unwrap_or_default();
    let jd_score_line = if job_description.is_some() {
        "- jdMatchScore (0-100): skills alignment, experience match, keyword coverage\n"
    } else {
        "- jdMatchScore: null (no job description)\n"
    };

    fill_template(
        RESCORE_TEMPLATE,
        &[
            ("resume_text", improved),
            ("job_section", job_section.as_str()),
            ("jd_score_line", jd_score_line),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    )
}

/// Rewrite → rescore. Only the rewrite can fail the request.
pub async fn improve_resume(
    config: &Config,
    gateway: &dyn ModelGateway,
    request: ImproveRequest,
) -> Result<ImprovedResume, AppError> {
    let input = validate_input(&request.resume_text, request.job_description.as_deref())?;
    let credential = resolve_credential(&request.credential, config)?;
    let runner = StageRunner::new(gateway, &credential);

    let suggestions = request.suggestions.to_list();
    let formatting = request
        .structure_analysis
        .map(|s| s.formatting)
        .unwrap_or_default();
    info!(
        "Improving resume: {} suggestions, preserve structure: {}, JD provided: {}",
        suggestions.len(),
        request.preserve_structure,
        input.job_description.is_some()
    );

    let prompt = build_improve_prompt(
        &input,
        &suggestions,
        &formatting,
        request.preserve_structure,
    );
    let improved = runner
        .call_text(Stage::ResumeRewrite, &prompt)
        .await
        .map_err(classify)?
        .trim()
        .to_string();
    info!("Improved resume generated ({} chars)", improved.chars().count());

    let rescore_prompt = build_rescore_prompt(&improved, input.job_description.as_deref());
    let scores = match runner
        .call_json::<ResumeScores>(Stage::Rescore, &rescore_prompt)
        .await
    {
        Ok(mut scores) => {
            if input.job_description.is_none() {
                scores.jd_match_score = None;
            }
            Some(scores)
        }
        Err(e) => {
            warn!("Could not score improved resume, continuing without scores: {e}");
            None
        }
    };

    Ok(ImprovedResume {
        improved_resume: improved,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::ScriptedGateway;
    use crate::llm_client::GatewayError;
    use serde_json::json;

    fn request(body: serde_json::Value) -> ImproveRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_grouped_suggestions_skip_removals() {
        let input: SuggestionInput = serde_json::from_value(json!({
            "additions": ["Add Kubernetes"],
            "removals": ["Drop hobbies"],
            "improvements": ["Quantify impact"]
        }))
        .unwrap();
        assert_eq!(input.to_list(), vec!["Add Kubernetes", "Quantify impact"]);
    }

    #[test]
    fn test_flat_suggestions_pass_through() {
        let input: SuggestionInput = serde_json::from_value(json!(["One", "Two"])).unwrap();
        assert_eq!(input.to_list(), vec!["One", "Two"]);
    }

    #[test]
    fn test_improve_prompt_numbers_suggestions_and_picks_task() {
        let input = AnalysisInput {
            resume_text: "Jane Roe".into(),
            job_description: None,
        };
        let prompt = build_improve_prompt(
            &input,
            &["Add metrics".into(), "Add summary".into()],
            &["Use one column".into()],
            true,
        );
        assert!(prompt.contains("1. Add metrics\n2. Add summary"));
        assert!(prompt.contains("## FORMATTING RECOMMENDATIONS:\n1. Use one column"));
        assert!(prompt.contains(PRESERVE_STRUCTURE_TASK));
        assert!(prompt.contains("No job description provided"));
    }

    #[tokio::test]
    async fn test_improve_returns_rewrite_and_scores() {
        let gateway = ScriptedGateway::new()
            .reply(Stage::ResumeRewrite, "  Jane Roe\n• Led migration  \n")
            .reply(
                Stage::Rescore,
                r#"{"atsScore": 88, "jdMatchScore": 70, "structureScore": 90, "feedback": "Solid"}"#,
            );
        let config = Config::for_tests(Some("shared"));

        let result = improve_resume(
            &config,
            &gateway,
            request(json!({"resumeText": "Jane Roe", "suggestions": ["Add metrics"]})),
        )
        .await
        .unwrap();

        assert_eq!(result.improved_resume, "Jane Roe\n• Led migration");
        let scores = result.scores.unwrap();
        assert_eq!(scores.ats_score, 88);
        assert!(scores.jd_match_score.is_none());
        assert_eq!(
            gateway.stages_called(),
            vec![Stage::ResumeRewrite, Stage::Rescore]
        );
        assert!(gateway.calls()[1].prompt.contains("• Led migration"));
    }

    #[tokio::test]
    async fn test_rescore_failure_yields_no_scores() {
        let gateway = ScriptedGateway::new()
            .reply(Stage::ResumeRewrite, "Jane Roe")
            .fail(Stage::Rescore, || GatewayError::Provider("429".into()));
        let config = Config::for_tests(Some("shared"));

        let result = improve_resume(&config, &gateway, request(json!({"resumeText": "Jane Roe"})))
            .await
            .unwrap();

        assert!(result.scores.is_none());
    }

    #[tokio::test]
    async fn test_rewrite_failure_is_classified() {
        let gateway = ScriptedGateway::new().fail(Stage::ResumeRewrite, || GatewayError::Api {
            status: 401,
            reason: None,
            message: "bad key".into(),
        });
        let config = Config::for_tests(None);

        let err = improve_resume(
            &config,
            &gateway,
            request(json!({
                "resumeText": "Jane Roe",
                "useSharedKey": false,
                "apiKey": "mine"
            })),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
