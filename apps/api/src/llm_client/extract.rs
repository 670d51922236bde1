//! Response Extractor: recovers a JSON object from raw model output.
//!
//! Models wrap JSON in prose or markdown fences. Extraction narrows the text in two
//! steps, then parses strictly:
//! 1. first fenced block (```` ``` ```` or ```` ```json ````), if any
//! 2. first `{` to last `}` inclusive
//! 3. `serde_json` parse; no repair of the isolated payload

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum MalformedOutput {
    #[error("no JSON object found in model output")]
    NoObject,

    #[error("model output is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("model output does not match the expected shape: {0}")]
    Shape(serde_json::Error),

    #[error("model output is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Extracts the key/value document from raw model text.
pub fn extract_document(raw: &str) -> Result<Map<String, Value>, MalformedOutput> {
    let candidate = fenced_block(raw).unwrap_or(raw);
    let payload = outer_object(candidate).ok_or(MalformedOutput::NoObject)?;

    match serde_json::from_str::<Value>(payload).map_err(MalformedOutput::InvalidJson)? {
        Value::Object(map) => Ok(map),
        _ => Err(MalformedOutput::NoObject),
    }
}

/// Extracts the document and deserializes it into a typed record.
pub fn extract<T: DeserializeOwned>(raw: &str) -> Result<T, MalformedOutput> {
    let document = extract_document(raw)?;
    serde_json::from_value(Value::Object(document)).map_err(MalformedOutput::Shape)
}

/// Inner content of the first complete fenced block. An optional `json` tag is skipped.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// Substring from the first `{` through the last `}`.
fn outer_object(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        key: String,
    }

    #[test]
    fn test_fenced_json_with_tag_and_prose() {
        let raw = "Here is the analysis you asked for:\n```json\n{\"key\": \"value\"}\n```\nLet me know!";
        let direct: Map<String, Value> = serde_json::from_str("{\"key\": \"value\"}").unwrap();
        assert_eq!(extract_document(raw).unwrap(), direct);
    }

    #[test]
    fn test_fenced_json_without_tag() {
        let raw = "```\n{\"key\": \"value\"}\n```";
        let sample: Sample = extract(raw).unwrap();
        assert_eq!(sample.key, "value");
    }

    #[test]
    fn test_fence_content_is_narrowed_to_braces() {
        let raw = "```json\nResult: {\"key\": \"value\"} (end)\n```";
        let sample: Sample = extract(raw).unwrap();
        assert_eq!(sample.key, "value");
    }

    #[test]
    fn test_unfenced_object_surrounded_by_prose() {
        let raw = "Sure! {\"key\": \"value\", \"nested\": {\"n\": 1}} Hope this helps.";
        let doc = extract_document(raw).unwrap();
        assert_eq!(doc["key"], "value");
        assert_eq!(doc["nested"]["n"], 1);
    }

    #[test]
    fn test_no_object_is_malformed() {
        let err = extract_document("I could not analyze this resume.").unwrap_err();
        assert!(matches!(err, MalformedOutput::NoObject));
    }

    #[test]
    fn test_reversed_braces_are_malformed() {
        let err = extract_document("} nothing here {").unwrap_err();
        assert!(matches!(err, MalformedOutput::NoObject));
    }

    #[test]
    fn test_trailing_comma_is_not_repaired() {
        let err = extract_document("{\"key\": \"value\",}").unwrap_err();
        assert!(matches!(err, MalformedOutput::InvalidJson(_)));
    }

    #[test]
    fn test_single_quotes_are_not_repaired() {
        let err = extract_document("{'key': 'value'}").unwrap_err();
        assert!(matches!(err, MalformedOutput::InvalidJson(_)));
    }

    #[test]
    fn test_unclosed_fence_falls_back_to_whole_text() {
        let raw = "```json\n{\"key\": \"value\"}";
        let sample: Sample = extract(raw).unwrap();
        assert_eq!(sample.key, "value");
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let err = extract::<Sample>("{\"other\": 1}").unwrap_err();
        assert!(matches!(err, MalformedOutput::Shape(_)));
    }

    #[test]
    fn test_only_first_fenced_block_is_used() {
        let raw = "```json\n{\"key\": \"first\"}\n```\n```json\n{\"key\": \"second\"}\n```";
        let sample: Sample = extract(raw).unwrap();
        assert_eq!(sample.key, "first");
    }
}
