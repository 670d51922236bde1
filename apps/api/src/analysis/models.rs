//! Records passed between analysis stages, plus the request/response bodies.
//!
//! Records are lenient: models drop fields, send `null`, send numbers where text
//! was asked for, or vary the spelling of enum values. None of that fails a
//! stage. The only hard requirement is a numeric `atsScore` and `structureScore`
//! on the final report (plus `jdMatchScore` when a JD was supplied, enforced by
//! the pipeline).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const NOT_SPECIFIED: &str = "Not specified";

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Stage records
// ────────────────────────────────────────────────────────────────────────────

/// Output of résumé extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub candidate_name: String,
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub current_role: String,
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub years_experience: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub education: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub achievements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
}

/// Output of job-requirement extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequirements {
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub title: String,
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub required_years: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub must_have_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub required_certifications: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub industry_keywords: Vec<String>,
}

/// Output of gap analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    #[serde(default, deserialize_with = "lenient_list")]
    pub missing_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub underemphasized_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub missing_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub experience_gaps: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Final report
// ────────────────────────────────────────────────────────────────────────────

/// The scoring report returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
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
    /// Set by the pipeline from its own state; model output is ignored.
    #[serde(default)]
    pub has_job_description: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_context: Option<CandidateContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_findings: Option<KeyFindings>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Suggestions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub structure_analysis: StructureAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_actions: Option<Vec<PriorityAction>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContext {
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub name: String,
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub current_role: String,
    #[serde(default = "not_specified", deserialize_with = "lenient_text_or_unspecified")]
    pub years_experience: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub top_skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFindings {
    #[serde(default, deserialize_with = "lenient_list")]
    pub strong_matches: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub critical_gaps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub quick_wins: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default, deserialize_with = "lenient_list")]
    pub additions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub removals: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<SectionReview>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub formatting: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReview {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub status: SectionStatus,
    #[serde(default, deserialize_with = "lenient_text")]
    pub feedback: String,
}

/// Serialized as `good`, `needs-improvement` or `missing`. Decoding ignores
/// case and separators; unknown values become `NeedsImprovement`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SectionStatus {
    #[serde(rename = "good")]
    Good,
    #[default]
    #[serde(rename = "needs-improvement")]
    NeedsImprovement,
    #[serde(rename = "missing")]
    Missing,
}

impl<'de> Deserialize<'de> for SectionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = value_to_text(Value::deserialize(deserializer)?);
        Ok(match normalize_label(&raw).as_str() {
            "good" => SectionStatus::Good,
            "needs-improvement" | "needs-work" | "improve" => SectionStatus::NeedsImprovement,
            "missing" | "absent" => SectionStatus::Missing,
            other => {
                warn!("Unknown section status {other:?}; treating as needs-improvement");
                SectionStatus::NeedsImprovement
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAction {
    /// 0 when the model sent something that is not a number.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: u8,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: String,
    #[serde(default)]
    pub impact: Impact,
}

/// Serialized lowercase. Decoding ignores case; unknown values become `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Impact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = value_to_text(Value::deserialize(deserializer)?);
        Ok(match normalize_label(&raw).as_str() {
            "high" => Impact::High,
            "medium" | "med" | "moderate" => Impact::Medium,
            "low" => Impact::Low,
            other => {
                warn!("Unknown impact {other:?}; treating as medium");
                Impact::Medium
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request bodies
// ────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

/// Which credential pays for the model calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSelector {
    /// Use the server-managed key. Takes precedence over `api_key`.
    #[serde(default = "default_true")]
    pub use_shared_key: bool,
    #[serde(default, alias = "geminiApiKey")]
    pub api_key: Option<String>,
}

/// POST /api/analyze-resume
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(flatten)]
    pub credential: CredentialSelector,
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient field decoding
// ────────────────────────────────────────────────────────────────────────────

/// Strings pass through, numbers and booleans are stringified, anything else is empty.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

fn lenient_text_or_unspecified<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    let text = value_to_text(Value::deserialize(deserializer)?);
    Ok(if text.trim().is_empty() {
        not_specified()
    } else {
        text
    })
}

/// Non-array values become an empty list; non-text items are stringified or dropped.
fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

/// Lowercase, trimmed, with runs of spaces and underscores folded into `-`.
fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c == ' ' || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let rank = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('#').parse::<f64>().ok(),
        _ => None,
    };
    Ok(match rank.filter(|r| r.is_finite()) {
        Some(r) => r.round().clamp(0.0, f64::from(u8::MAX)) as u8,
        None => {
            warn!("Non-numeric priority {value}; using 0");
            0
        }
    })
}

/// Reads a 0–100 score from a number or numeric string, rounding and clamping.
fn parse_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let rounded = raw.round();
    if !(0.0..=100.0).contains(&rounded) {
        warn!("Model returned out-of-range score {raw}; clamping to 0-100");
    }
    Some(rounded.clamp(0.0, 100.0) as u8)
}

pub(crate) fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_score(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a 0-100 score, got {value}")))
}

/// Like `score`, but `null` and non-numeric values (`"N/A"`) decode to `None`.
/// Callers that need the score enforce its presence themselves.
pub(crate) fn optional_score<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u8>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let parsed = parse_score(&value);
    if parsed.is_none() {
        warn!("Ignoring non-numeric optional score {value}");
    }
    Ok(parsed)
}
