// All LLM prompt constants for the analysis pipeline.
// Templates use `{name}` placeholders filled by `llm_client::prompts::fill_template`.

/// The six résumé sections every structure analysis reports on, in order.
pub const STRUCTURE_SECTIONS: [&str; 6] = [
    "Contact Information",
    "Professional Summary",
    "Work Experience",
    "Skills",
    "Education",
    "Certifications",
];

pub const RESUME_EXTRACTION_SYSTEM: &str =
    "You are a precise résumé data extractor. Return only valid JSON.";

pub const JOB_REQUIREMENTS_SYSTEM: &str =
    "You are a precise job description data extractor. Return only valid JSON.";

pub const GAP_ANALYSIS_SYSTEM: &str =
    "You are a gap analysis expert comparing candidates to job requirements. Return only valid JSON.";

pub const FINAL_SYNTHESIS_SYSTEM: &str =
    "You are an expert ATS analyst. Return only valid JSON matching the exact schema specified.";

/// Replace: {resume_text}, {json_only}
pub const RESUME_EXTRACTION_TEMPLATE: &str = r#"Extract structured information from the résumé below.

RÉSUMÉ:
{resume_text}

Return a JSON object with this schema:
{
  "candidateName": "<full name, or 'Not specified'>",
  "currentRole": "<most recent job title>",
  "yearsExperience": "<estimated total years of experience>",
  "skills": ["<skill>", "..."],
  "education": ["<degree and institution>", "..."],
  "certifications": ["<certification>", "..."],
  "achievements": ["<quantified achievement>", "..."],
  "summary": "<two-sentence summary of the candidate>"
}

{json_only}"#;

/// Replace: {job_description}, {json_only}
pub const JOB_REQUIREMENTS_TEMPLATE: &str = r#"Extract the structured requirements from the job description below.

JOB DESCRIPTION:
{job_description}

Return a JSON object with this schema:
{
  "title": "<job title>",
  "requiredYears": "<required years of experience>",
  "mustHaveSkills": ["<required skill>", "..."],
  "niceToHaveSkills": ["<optional skill>", "..."],
  "requiredCertifications": ["<certification>", "..."],
  "keyResponsibilities": ["<responsibility>", "..."],
  "industryKeywords": ["<keyword>", "..."]
}

{json_only}"#;

/// Replace: {candidate_profile}, {job_requirements}, {json_only}
pub const GAP_ANALYSIS_TEMPLATE: &str = r#"Compare the candidate profile against the job requirements.

CANDIDATE PROFILE:
{candidate_profile}

JOB REQUIREMENTS:
{job_requirements}

Return a JSON object with this schema:
{
  "missingSkills": ["<JD skill absent from the résumé>"],
  "underemphasizedSkills": ["<skill present but not highlighted enough>"],
  "missingKeywords": ["<important JD keyword absent from the résumé>"],
  "experienceGaps": ["<experience requirement not clearly met>"]
}

{json_only}"#;

const ATS_RUBRIC: &str = "\
### ATS Score (0-100)
- Contact info (email, phone, location): 15 points
- Professional summary: 10 points
- Work experience section: 15 points
- Education section: 10 points
- Skills section: 10 points
- Standard section headings: 10 points
- Plain text format: 10 points
- Action verbs: 10 points
- Consistent dates: 5 points
- Single column layout: 5 points";

const JD_MATCH_RUBRIC: &str = "\
### JD Match Score (0-100)
- Required skills match: 40 points
- Nice-to-have skills: 15 points
- Years of experience: 15 points
- Certifications: 20 points
- Industry keywords: 10 points";

const STRUCTURE_RUBRIC: &str = "\
### Structure Score (0-100)
- Clear section headings: 15 points
- Consistent formatting: 10 points
- Bullet points: 15 points
- Quantified achievements: 15 points
- Proper length: 10 points
- White space: 15 points
- Logical order: 10 points
- No typos: 10 points";

/// Replace: {candidate_profile}, {job_requirements}, {gap_analysis}, {resume_excerpt},
///          {job_description_excerpt}, {rubrics}, {sections_schema}, {json_only}
pub const FINAL_WITH_JD_TEMPLATE: &str = r#"You are providing personalized résumé feedback for a specific job.

## EXTRACTED CANDIDATE DATA:
{candidate_profile}

## EXTRACTED JOB REQUIREMENTS:
{job_requirements}

## GAP ANALYSIS RESULTS:
{gap_analysis}

## ORIGINAL RÉSUMÉ TEXT:
{resume_excerpt}

## ORIGINAL JOB DESCRIPTION:
{job_description_excerpt}

Score the résumé with these rubrics:

{rubrics}

Return a JSON object in exactly this format:
{
  "atsScore": <integer 0-100>,
  "jdMatchScore": <integer 0-100>,
  "structureScore": <integer 0-100>,
  "hasJobDescription": true,
  "candidateContext": {
    "name": "<name>",
    "currentRole": "<role>",
    "yearsExperience": "<years>",
    "topSkills": ["<skill>", "<skill>", "<skill>"]
  },
  "keyFindings": {
    "strongMatches": ["<specific match with the JD>"],
    "criticalGaps": ["<specific gap against the JD>"],
    "quickWins": ["<easy improvement>"]
  },
  "suggestions": {
    "additions": ["<specific addition>"],
    "removals": ["<specific removal>"],
    "improvements": ["<specific improvement>"]
  },
  "structureAnalysis": {
    "sections": [
{sections_schema}
    ],
    "formatting": ["<specific formatting recommendation>"]
  },
  "priorityActions": [
    {"priority": 1, "action": "<most impactful change>", "impact": "high"},
    {"priority": 2, "action": "<second most impactful change>", "impact": "medium"},
    {"priority": 3, "action": "<third most impactful change>", "impact": "low"}
  ]
}

{json_only}"#;

/// Replace: {candidate_profile}, {resume_excerpt}, {rubrics}, {sections_schema}, {json_only}
pub const FINAL_RESUME_ONLY_TEMPLATE: &str = r#"You are providing personalized résumé feedback. No job description was provided.

## EXTRACTED CANDIDATE DATA:
{candidate_profile}

## ORIGINAL RÉSUMÉ TEXT:
{resume_excerpt}

Score the résumé with these rubrics:

{rubrics}

Return a JSON object in exactly this format:
{
  "atsScore": <integer 0-100>,
  "structureScore": <integer 0-100>,
  "hasJobDescription": false,
  "candidateContext": {
    "name": "<name>",
    "currentRole": "<role>",
    "yearsExperience": "<years>",
    "topSkills": ["<skill>", "<skill>", "<skill>"]
  },
  "keyFindings": {
    "strongMatches": ["<strong point in the résumé>"],
    "criticalGaps": ["<area needing improvement>"],
    "quickWins": ["<easy fix>"]
  },
  "suggestions": {
    "additions": ["<specific addition>"],
    "removals": ["<specific removal>"],
    "improvements": ["<specific improvement>"]
  },
  "structureAnalysis": {
    "sections": [
{sections_schema}
    ],
    "formatting": ["<specific formatting recommendation>"]
  },
  "priorityActions": [
    {"priority": 1, "action": "<most impactful change>", "impact": "high"},
    {"priority": 2, "action": "<second most impactful change>", "impact": "medium"},
    {"priority": 3, "action": "<third most impactful change>", "impact": "low"}
  ]
}

{json_only}"#;

/// Rubric block for the final synthesis prompt.
pub fn rubrics(with_job_description: bool) -> String {
    if with_job_description {
        [ATS_RUBRIC, JD_MATCH_RUBRIC, STRUCTURE_RUBRIC].join("\n\n")
    } else {
        [ATS_RUBRIC, STRUCTURE_RUBRIC].join("\n\n")
    }
}

/// One schema line per entry in `STRUCTURE_SECTIONS`.
pub fn sections_schema() -> String {
    STRUCTURE_SECTIONS
        .iter()
        .map(|name| {
            format!(
                "      {{\"name\": \"{name}\", \"status\": \"good|needs-improvement|missing\", \"feedback\": \"<specific feedback>\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Résumé improvement
// ────────────────────────────────────────────────────────────────────────────

pub const IMPROVE_SYSTEM: &str = "You are an expert résumé writer and career coach. \
    Return only the improved résumé as plain text. \
    No explanations, no comments, no markdown.";

pub const RESCORE_SYSTEM: &str = "You are an ATS scoring expert. Return only valid JSON.";

/// Replace: {resume_text}, {target}, {suggestions}, {formatting}, {task}
pub const IMPROVE_TEMPLATE: &str = r#"Improve the résumé below by applying the listed suggestions.

## ORIGINAL RÉSUMÉ:
{resume_text}

{target}

## SUGGESTIONS TO APPLY:
{suggestions}
{formatting}
## YOUR TASK:
{task}

## OUTPUT STRUCTURE
Follow this order, omitting sections the original does not support:
1. HEADER: full name, then contact details on one line separated by |
2. SUMMARY: two or three sentences
3. EDUCATION: Institution | Location, then Degree | Dates
4. EXPERIENCE: Company | Location, then Role | Dates, then • bullet achievements with metrics
5. PROJECTS: Name | Technologies | Date, then • bullets
6. SKILLS: grouped lines such as "Languages: ..." and "Tools: ..."
7. CERTIFICATIONS: • Name -- Issuer
8. ACHIEVEMENTS: • description

Use | between items on one line and • for bullets. Return plain text only."#;

pub const PRESERVE_STRUCTURE_TASK: &str = "\
Keep the EXACT section order, headings and layout of the original.
- Only change the content inside each section
- Do not add or remove sections unless a suggestion says so
- Work JD keywords and skills into the existing sections
- Strengthen bullets with action verbs and metrics
- Keep the candidate's own voice";

pub const REWRITE_TASK: &str = "\
Rewrite the résumé applying ALL suggestions above:
- Add the recommended keywords, skills and achievements
- Apply every improvement and formatting recommendation
- Use strong action verbs and quantified results
- Keep a clean, ATS-friendly structure";

/// Replace: {resume_text}, {job_section}, {jd_score_line}, {json_only}
pub const RESCORE_TEMPLATE: &str = r#"Score the résumé below.

## RÉSUMÉ:
{resume_text}
{job_section}
## SCORING CRITERIA:
- atsScore (0-100): keyword optimization, standard sections, parsability, formatting
- structureScore (0-100): organization, formatting, section completeness
{jd_score_line}
Return a JSON object:
{
  "atsScore": <integer>,
  "jdMatchScore": <integer or null>,
  "structureScore": <integer>,
  "feedback": "<brief feedback on what to improve next>"
}

{json_only}"#;

// ────────────────────────────────────────────────────────────────────────────
// Résumé chat
// ────────────────────────────────────────────────────────────────────────────

pub const CHAT_SYSTEM: &str = "You are an expert career coach and résumé consultant \
    with deep knowledge of ATS systems, hiring practices and résumé optimization.";

/// Appended to `CHAT_SYSTEM`.
/// Replace: {candidate}, {scores}, {findings}, {priorities}, {additions},
/// {removals}, {improvements}, {resume_text}, {job_description}
pub const CHAT_CONTEXT_TEMPLATE: &str = r#"## YOUR KNOWLEDGE BASE FOR THIS CONVERSATION:

### CANDIDATE PROFILE:
{candidate}

### ANALYSIS SCORES:
{scores}

### KEY FINDINGS:
{findings}

### PRIORITY ACTIONS:
{priorities}

### SUGGESTED CHANGES:
Additions: {additions}
Removals: {removals}
Improvements: {improvements}

### FULL RÉSUMÉ TEXT (for specific references):
{resume_text}

### TARGET JOB DESCRIPTION:
{job_description}

## CONVERSATION GUIDELINES:
1. Be specific: quote the résumé or JD when giving advice
2. Be actionable: give step-by-step guidance, not vague suggestions
3. Be honest: name weaknesses, explain why, and say how to fix them
4. Prioritize: steer the candidate to high-impact changes first
5. Be concise: two to four paragraphs unless detail is asked for

## RESPONSE PATTERNS:
- "why" questions: explain the reasoning with industry context
- "how" questions: numbered implementation steps
- "what" questions: quote specific lines from the résumé
- rewrite requests: give before/after examples
- priority questions: refer to the priority actions list

Be encouraging while staying honest about areas for improvement."#;

pub const NO_JOB_DESCRIPTION_NOTE: &str =
    "No job description provided. Focus on general résumé best practices and ATS optimization.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_schema_lists_all_six_sections() {
        let schema = sections_schema();
        for name in STRUCTURE_SECTIONS {
            assert!(schema.contains(&format!("\"name\": \"{name}\"")));
        }
        assert_eq!(schema.lines().count(), 6);
    }

    #[test]
    fn test_rubrics_include_jd_match_only_with_job_description() {
        assert!(rubrics(true).contains("JD Match Score"));
        assert!(!rubrics(false).contains("JD Match Score"));
        assert!(rubrics(false).contains("Structure Score"));
    }

    #[test]
    fn test_chat_context_has_every_placeholder_once() {
        for name in [
            "candidate",
            "scores",
            "findings",
            "priorities",
            "additions",
            "removals",
            "improvements",
            "resume_text",
            "job_description",
        ] {
            let token = format!("{{{name}}}");
            assert_eq!(CHAT_CONTEXT_TEMPLATE.matches(&token).count(), 1, "{token}");
        }
    }

    #[test]
    fn test_stage_system_instructions_are_distinct() {
        let all = [
            RESUME_EXTRACTION_SYSTEM,
            JOB_REQUIREMENTS_SYSTEM,
            GAP_ANALYSIS_SYSTEM,
            FINAL_SYNTHESIS_SYSTEM,
            IMPROVE_SYSTEM,
            RESCORE_SYSTEM,
            CHAT_SYSTEM,
        ];
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                if i != j {
                    assert!(!a.starts_with(b), "{a:?} starts with {b:?}");
                }
            }
        }
    }
}
