//! Scripted `ModelGateway` for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::analysis::stages::Stage;
use crate::llm_client::{ApiKey, ChatTurn, GatewayError, ModelGateway};

type Responder = Box<dyn Fn() -> Result<String, GatewayError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: Option<Stage>,
    pub system_instruction: String,
    /// Content of the final (user) turn.
    pub prompt: String,
    pub turns: Vec<ChatTurn>,
}

/// Replies per stage and records every call. A stage is recognised by the
/// system instruction starting with that stage's instruction. A stage without
/// a script fails the call with a provider error.
#[derive(Default)]
pub struct ScriptedGateway {
    responders: HashMap<Stage, Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

const ALL_STAGES: [Stage; 7] = [
    Stage::ResumeExtraction,
    Stage::JobRequirementExtraction,
    Stage::GapAnalysis,
    Stage::FinalSynthesis,
    Stage::ResumeRewrite,
    Stage::Rescore,
    Stage::Chat,
];

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, stage: Stage, text: &str) -> Self {
        let text = text.to_string();
        self.responders
            .insert(stage, Box::new(move || Ok(text.clone())));
        self
    }

    pub fn fail(
        mut self,
        stage: Stage,
        error: impl Fn() -> GatewayError + Send + Sync + 'static,
    ) -> Self {
        self.responders.insert(stage, Box::new(move || Err(error())));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stages_called(&self) -> Vec<Stage> {
        self.calls().into_iter().filter_map(|c| c.stage).collect()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn converse(
        &self,
        system_instruction: &str,
        turns: &[ChatTurn],
        _credential: &ApiKey,
    ) -> Result<String, GatewayError> {
        let stage = ALL_STAGES
            .into_iter()
            .find(|s| system_instruction.starts_with(s.system_instruction()));
        self.calls.lock().unwrap().push(RecordedCall {
            stage,
            system_instruction: system_instruction.to_string(),
            prompt: turns.last().map(|t| t.content.clone()).unwrap_or_default(),
            turns: turns.to_vec(),
        });

        match stage.and_then(|s| self.responders.get(&s)) {
            Some(responder) => responder(),
            None => Err(GatewayError::Provider(format!(
                "no scripted reply for {stage:?}"
            ))),
        }
    }
}

/// A well-formed final synthesis reply for the résumé-only variant.
pub const RESUME_ONLY_REPORT: &str = r#"```json
{
  "atsScore": 72,
  "structureScore": 65,
  "hasJobDescription": false,
  "candidateContext": {
    "name": "John Doe",
    "currentRole": "Software Engineer",
    "yearsExperience": "5",
    "topSkills": ["Python"]
  },
  "keyFindings": {
    "strongMatches": ["Clear role progression"],
    "criticalGaps": ["No quantified achievements"],
    "quickWins": ["Add a skills section"]
  },
  "suggestions": {
    "additions": ["Add metrics to bullets"],
    "removals": ["Remove objective statement"],
    "improvements": ["Use stronger action verbs"]
  },
  "structureAnalysis": {
    "sections": [
      {"name": "Contact Information", "status": "missing", "feedback": "Add email and phone"},
      {"name": "Professional Summary", "status": "needs-improvement", "feedback": "Too short"},
      {"name": "Work Experience", "status": "good", "feedback": "Clear"},
      {"name": "Skills", "status": "needs-improvement", "feedback": "List more tools"},
      {"name": "Education", "status": "missing", "feedback": "Add degree"},
      {"name": "Certifications", "status": "missing", "feedback": "Optional"}
    ],
    "formatting": ["Use consistent date format"]
  },
  "priorityActions": [
    {"priority": 1, "action": "Add contact details", "impact": "high"},
    {"priority": 2, "action": "Quantify achievements", "impact": "medium"},
    {"priority": 3, "action": "Add education", "impact": "low"}
  ]
}
```"#;

/// A well-formed final synthesis reply for the job-description variant.
pub const WITH_JD_REPORT: &str = r#"Analysis complete.
{
  "atsScore": 81,
  "jdMatchScore": 58,
  "structureScore": 77,
  "hasJobDescription": true,
  "keyFindings": {
    "strongMatches": ["Python"],
    "criticalGaps": ["Kubernetes"],
    "quickWins": ["Mention Docker"]
  },
  "suggestions": {"additions": ["Kubernetes"], "removals": [], "improvements": []},
  "structureAnalysis": {"sections": [], "formatting": []},
  "priorityActions": [
    {"priority": 1, "action": "Add Kubernetes experience", "impact": "high"}
  ]
}
Good luck!"#;

pub const PROFILE_REPLY: &str = r#"{
  "candidateName": "John Doe",
  "currentRole": "Software Engineer",
  "yearsExperience": "5",
  "skills": ["Python"],
  "education": [],
  "certifications": [],
  "achievements": [],
  "summary": "Backend engineer."
}"#;

pub const REQUIREMENTS_REPLY: &str = r#"{
  "title": "Platform Engineer",
  "requiredYears": "3+",
  "mustHaveSkills": ["Python", "Kubernetes"],
  "niceToHaveSkills": ["Go"],
  "requiredCertifications": [],
  "keyResponsibilities": ["Operate clusters"],
  "industryKeywords": ["cloud"]
}"#;

pub const GAPS_REPLY: &str = r#"{
  "missingSkills": ["Kubernetes"],
  "underemphasizedSkills": [],
  "missingKeywords": ["cloud"],
  "experienceGaps": []
}"#;

/// Gateway scripted with well-formed replies for every analysis stage.
pub fn happy_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .reply(Stage::ResumeExtraction, PROFILE_REPLY)
        .reply(Stage::JobRequirementExtraction, REQUIREMENTS_REPLY)
        .reply(Stage::GapAnalysis, GAPS_REPLY)
}
