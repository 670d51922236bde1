//! Stage executors: one model call + extraction each.
//!
//! Executors are pure functions of their inputs and the gateway. They never catch
//! gateway or extractor failures; `PipelineError` carries them to the orchestrator.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::models::{AnalysisReport, CandidateProfile, GapAnalysis, JobRequirements};
use crate::analysis::prompts::{
    rubrics, sections_schema, CHAT_SYSTEM, FINAL_RESUME_ONLY_TEMPLATE, FINAL_SYNTHESIS_SYSTEM,
    FINAL_WITH_JD_TEMPLATE, GAP_ANALYSIS_SYSTEM, GAP_ANALYSIS_TEMPLATE, IMPROVE_SYSTEM,
    JOB_REQUIREMENTS_SYSTEM, JOB_REQUIREMENTS_TEMPLATE, RESCORE_SYSTEM, RESUME_EXTRACTION_SYSTEM,
    RESUME_EXTRACTION_TEMPLATE,
};
use crate::llm_client::extract::{extract, MalformedOutput};
use crate::llm_client::prompts::{fill_template, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{ApiKey, ChatTurn, GatewayError, ModelGateway};

/// Résumé characters embedded verbatim in the final synthesis prompt.
pub const RESUME_EXCERPT_CHARS: usize = 5_000;
/// Job-description characters embedded verbatim in the final synthesis prompt.
pub const JOB_DESCRIPTION_EXCERPT_CHARS: usize = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResumeExtraction,
    JobRequirementExtraction,
    GapAnalysis,
    FinalSynthesis,
    ResumeRewrite,
    Rescore,
    Chat,
}

impl Stage {
    pub fn system_instruction(self) -> &'static str {
        match self {
            Stage::ResumeExtraction => RESUME_EXTRACTION_SYSTEM,
            Stage::JobRequirementExtraction => JOB_REQUIREMENTS_SYSTEM,
            Stage::GapAnalysis => GAP_ANALYSIS_SYSTEM,
            Stage::FinalSynthesis => FINAL_SYNTHESIS_SYSTEM,
            Stage::ResumeRewrite => IMPROVE_SYSTEM,
            Stage::Rescore => RESCORE_SYSTEM,
            Stage::Chat => CHAT_SYSTEM,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ResumeExtraction => "resume extraction",
            Stage::JobRequirementExtraction => "job requirement extraction",
            Stage::GapAnalysis => "gap analysis",
            Stage::FinalSynthesis => "final synthesis",
            Stage::ResumeRewrite => "resume rewrite",
            Stage::Rescore => "rescore",
            Stage::Chat => "resume chat",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Gateway {
        stage: Stage,
        #[source]
        source: GatewayError,
    },

    #[error("{stage} returned malformed output: {source}")]
    Malformed {
        stage: Stage,
        #[source]
        source: MalformedOutput,
    },

    #[error("failed to encode {stage} input: {source}")]
    Encode {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
}

/// Gateway + credential for one pipeline execution.
#[derive(Clone, Copy)]
pub struct StageRunner<'a> {
    gateway: &'a dyn ModelGateway,
    credential: &'a ApiKey,
}

impl<'a> StageRunner<'a> {
    pub fn new(gateway: &'a dyn ModelGateway, credential: &'a ApiKey) -> Self {
        Self {
            gateway,
            credential,
        }
    }

    /// Sends the raw prompt for `stage` and returns the model's text untouched.
    pub async fn call_text(&self, stage: Stage, prompt: &str) -> Result<String, PipelineError> {
        info!("[{stage}] calling model ({} prompt chars)", prompt.chars().count());
        self.gateway
            .invoke(stage.system_instruction(), prompt, self.credential)
            .await
            .map_err(|source| PipelineError::Gateway { stage, source })
    }

    /// Multi-turn call. `system_instruction` extends the stage's own instruction
    /// with per-request context; `turns` ends with the user turn to answer.
    pub async fn converse(
        &self,
        stage: Stage,
        system_instruction: &str,
        turns: &[ChatTurn],
    ) -> Result<String, PipelineError> {
        info!("[{stage}] calling model ({} turns)", turns.len());
        self.gateway
            .converse(system_instruction, turns, self.credential)
            .await
            .map_err(|source| PipelineError::Gateway { stage, source })
    }

    /// Calls the model and runs the output through the response extractor.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: &str,
    ) -> Result<T, PipelineError> {
        let raw = self.call_text(stage, prompt).await?;
        let record = extract(&raw).map_err(|source| PipelineError::Malformed { stage, source })?;
        debug!("[{stage}] extracted structured output");
        Ok(record)
    }
}

/// First `max_chars` characters of `text`. Never splits a UTF-8 sequence.
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn to_document<T: Serialize>(stage: Stage, record: &T) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(record).map_err(|source| PipelineError::Encode { stage, source })
}

// ────────────────────────────────────────────────────────────────────────────
// Executors
// ────────────────────────────────────────────────────────────────────────────

pub async fn extract_candidate_profile(
    runner: StageRunner<'_>,
    resume_text: &str,
) -> Result<CandidateProfile, PipelineError> {
    let prompt = fill_template(
        RESUME_EXTRACTION_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    );
    runner.call_json(Stage::ResumeExtraction, &prompt).await
}

pub async fn extract_job_requirements(
    runner: StageRunner<'_>,
    job_description: &str,
) -> Result<JobRequirements, PipelineError> {
    let prompt = fill_template(
        JOB_REQUIREMENTS_TEMPLATE,
        &[
            ("job_description", job_description),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    );
    runner
        .call_json(Stage::JobRequirementExtraction, &prompt)
        .await
}

pub async fn analyze_gaps(
    runner: StageRunner<'_>,
    profile: &CandidateProfile,
    requirements: &JobRequirements,
) -> Result<GapAnalysis, PipelineError> {
    let stage = Stage::GapAnalysis;
    let candidate_profile = to_document(stage, profile)?;
    let job_requirements = to_document(stage, requirements)?;

    let prompt = fill_template(
        GAP_ANALYSIS_TEMPLATE,
        &[
            ("candidate_profile", candidate_profile.as_str()),
            ("job_requirements", job_requirements.as_str()),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    );
    runner.call_json(stage, &prompt).await
}

/// Final synthesis, résumé-only variant.
pub async fn synthesize_resume_only(
    runner: StageRunner<'_>,
    resume_text: &str,
    profile: &CandidateProfile,
) -> Result<AnalysisReport, PipelineError> {
    let stage = Stage::FinalSynthesis;
    let candidate_profile = to_document(stage, profile)?;
    let rubrics = rubrics(false);
    let sections = sections_schema();

    let prompt = fill_template(
        FINAL_RESUME_ONLY_TEMPLATE,
        &[
            ("candidate_profile", candidate_profile.as_str()),
            ("resume_excerpt", head(resume_text, RESUME_EXCERPT_CHARS)),
            ("rubrics", rubrics.as_str()),
            ("sections_schema", sections.as_str()),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    );
    runner.call_json(stage, &prompt).await
}

/// Final synthesis, job-description variant.
pub async fn synthesize_with_job_description(
    runner: StageRunner<'_>,
    resume_text: &str,
    job_description: &str,
    profile: &CandidateProfile,
    requirements: &JobRequirements,
    gaps: &GapAnalysis,
) -> Result<AnalysisReport, PipelineError> {
    let stage = Stage::FinalSynthesis;
    let candidate_profile = to_document(stage, profile)?;
    let job_requirements = to_document(stage, requirements)?;
    let gap_analysis = to_document(stage, gaps)?;
    let rubrics = rubrics(true);
    let sections = sections_schema();

    let prompt = fill_template(
        FINAL_WITH_JD_TEMPLATE,
        &[
            ("candidate_profile", candidate_profile.as_str()),
            ("job_requirements", job_requirements.as_str()),
            ("gap_analysis", gap_analysis.as_str()),
            ("resume_excerpt", head(resume_text, RESUME_EXCERPT_CHARS)),
            (
                "job_description_excerpt",
                head(job_description, JOB_DESCRIPTION_EXCERPT_CHARS),
            ),
            ("rubrics", rubrics.as_str()),
            ("sections_schema", sections.as_str()),
            ("json_only", JSON_ONLY_INSTRUCTION),
        ],
    );
    runner.call_json(stage, &prompt).await
}
