//! Analysis pipeline: validates the request, resolves the credential, then runs
//! the stages in a fixed linear order.
//!
//! Flow without a JD: resume extraction → final synthesis (résumé-only).
//! Flow with a JD:    resume extraction → JD extraction → gap analysis →
//!                    final synthesis (with JD).
//!
//! Any stage failure aborts the request. No retries, no partial reports.

use anyhow::anyhow;
use tracing::info;

use crate::analysis::classify::classify;
use crate::analysis::models::{
    AnalysisReport, AnalysisRequest, CandidateProfile, CredentialSelector, GapAnalysis,
    JobRequirements,
};
use crate::analysis::stages::{
    analyze_gaps, extract_candidate_profile, extract_job_requirements, synthesize_resume_only,
    synthesize_with_job_description, PipelineError, Stage, StageRunner,
};
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::extract::MalformedOutput;
use crate::llm_client::{ApiKey, ModelGateway};

pub const MAX_RESUME_CHARS: usize = 50_000;
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 20_000;

/// Trimmed, size-checked pipeline input.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub resume_text: String,
    /// `None` when the caller sent no JD or only whitespace.
    pub job_description: Option<String>,
}

/// Intermediate state once résumé extraction has run.
/// The final synthesis variant is chosen by matching on this.
#[derive(Debug)]
pub enum PipelineState<'a> {
    ResumeOnly {
        profile: CandidateProfile,
    },
    WithJobDescription {
        job_description: &'a str,
        profile: CandidateProfile,
        requirements: JobRequirements,
        gaps: GapAnalysis,
    },
}

/// Checks résumé/JD limits. Runs before any model call.
pub fn validate_input(
    resume_text: &str,
    job_description: Option<&str>,
) -> Result<AnalysisInput, AppError> {
    let resume_text = resume_text.trim();
    if resume_text.is_empty() {
        return Err(AppError::Validation("Resume text is required".to_string()));
    }

    let resume_len = resume_text.chars().count();
    if resume_len > MAX_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "Resume too long ({resume_len} chars). Max {MAX_RESUME_CHARS} chars."
        )));
    }

    let job_description = job_description.map(str::trim).filter(|jd| !jd.is_empty());
    if let Some(jd) = job_description {
        let jd_len = jd.chars().count();
        if jd_len > MAX_JOB_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "Job description too long ({jd_len} chars). Max {MAX_JOB_DESCRIPTION_CHARS} chars."
            )));
        }
    }

    Ok(AnalysisInput {
        resume_text: resume_text.to_string(),
        job_description: job_description.map(String::from),
    })
}

/// Picks the credential for this request. The shared key wins when selected.
pub fn resolve_credential(
    selector: &CredentialSelector,
    config: &Config,
) -> Result<ApiKey, AppError> {
    if selector.use_shared_key {
        let key = config
            .shared_llm_api_key
            .as_deref()
            .and_then(ApiKey::new)
            .ok_or_else(|| AppError::Internal(anyhow!("Shared LLM key not configured on server")))?;
        info!("Using shared LLM key");
        return Ok(key);
    }

    let key = selector
        .api_key
        .as_deref()
        .and_then(ApiKey::new)
        .ok_or_else(|| {
            AppError::Validation(
                "Either use the shared key or provide your own API key".to_string(),
            )
        })?;
    info!("Using caller-provided API key");
    Ok(key)
}

/// Runs the stages for one validated input. Failures are returned unclassified.
pub async fn run_pipeline(
    gateway: &dyn ModelGateway,
    credential: &ApiKey,
    input: &AnalysisInput,
) -> Result<AnalysisReport, PipelineError> {
    let runner = StageRunner::new(gateway, credential);
    info!(
        "=== Starting analysis pipeline (JD provided: {}) ===",
        input.job_description.is_some()
    );

    let profile = extract_candidate_profile(runner, &input.resume_text).await?;

    let state = match input.job_description.as_deref() {
        None => PipelineState::ResumeOnly { profile },
        Some(jd) => {
            let requirements = extract_job_requirements(runner, jd).await?;
            let gaps = analyze_gaps(runner, &profile, &requirements).await?;
            PipelineState::WithJobDescription {
                job_description: jd,
                profile,
                requirements,
                gaps,
            }
        }
    };

    let report = match &state {
        PipelineState::ResumeOnly { profile } => {
            let mut report = synthesize_resume_only(runner, &input.resume_text, profile).await?;
            report.has_job_description = false;
            report.jd_match_score = None;
            report
        }
        PipelineState::WithJobDescription {
            job_description,
            profile,
            requirements,
            gaps,
        } => {
            let mut report = synthesize_with_job_description(
                runner,
                &input.resume_text,
                job_description,
                profile,
                requirements,
                gaps,
            )
            .await?;
            if report.jd_match_score.is_none() {
                return Err(PipelineError::Malformed {
                    stage: Stage::FinalSynthesis,
                    source: MalformedOutput::MissingField("jdMatchScore"),
                });
            }
            report.has_job_description = true;
            report
        }
    };

    info!(
        "=== Pipeline complete: ats={}, jd_match={:?}, structure={} ===",
        report.ats_score, report.jd_match_score, report.structure_score
    );
    Ok(report)
}

/// Analyze: validate → resolve credential → run stages → classify failures once.
pub async fn analyze(
    config: &Config,
    gateway: &dyn ModelGateway,
    request: AnalysisRequest,
) -> Result<AnalysisReport, AppError> {
    info!(
        "Received analysis request: resume {} chars, JD provided: {}, shared key: {}",
        request.resume_text.chars().count(),
        request
            .job_description
            .as_deref()
            .is_some_and(|jd| !jd.trim().is_empty()),
        request.credential.use_shared_key
    );

    let input = validate_input(&request.resume_text, request.job_description.as_deref())?;
    let credential = resolve_credential(&request.credential, config)?;

    run_pipeline(gateway, &credential, &input)
        .await
        .map_err(classify)
}
