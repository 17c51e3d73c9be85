//! Strict parsing of model replies into [`PrivacyAnalysis`].
//!
//! Models wrap JSON in prose or markdown fences often enough that the object
//! has to be located first. Once located it must validate against the schema
//! in full; there is no partial acceptance.

mod schema;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::types::PrivacyAnalysis;

pub use schema::validate_analysis_schema;

lazy_static! {
    /// A fenced block holding a JSON object, with or without a `json` tag.
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap();
}

/// Errors from parsing a model reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),

    #[error("Response contains no JSON object")]
    NoJson,

    #[error("Response JSON is malformed: {0}")]
    InvalidJson(String),

    #[error("Response violates the analysis schema: {}", .0.join("; "))]
    Violations(Vec<String>),

    #[error("Response could not be decoded: {0}")]
    Deserialize(String),
}

/// Possible JSON object spans in `text`, most specific first.
fn json_candidates(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    let mut candidates = Vec::new();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        candidates.push(trimmed);
    }
    if let Some(fenced) = FENCED_JSON.captures(trimmed).and_then(|c| c.get(1)) {
        candidates.push(fenced.as_str());
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.dedup();
    candidates
}

/// Parse and validate a model reply.
pub fn parse_privacy_analysis(text: &str) -> Result<PrivacyAnalysis, SchemaError> {
    let candidates = json_candidates(text);
    if candidates.is_empty() {
        return Err(SchemaError::NoJson);
    }

    let mut last_error = None;
    let value = candidates.into_iter().find_map(|candidate| {
        match serde_json::from_str::<serde_json::Value>(candidate) {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => {
                last_error = Some("top-level value is not an object".to_string());
                None
            }
            Err(e) => {
                last_error = Some(e.to_string());
                None
            }
        }
    });

    let value = value.ok_or_else(|| SchemaError::InvalidJson(last_error.unwrap_or_default()))?;

    validate_analysis_schema(&value)?;

    serde_json::from_value(value).map_err(|e| SchemaError::Deserialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "privacy_score": 35,
        "score_explanation": "Shares data with advertisers.",
        "terms_analysis": {
            "ok": ["Users can export data"],
            "neutral": ["Uses session cookies"],
            "bad": ["Shares data with advertising networks"]
        },
        "data_selling": "Data is shared with ad partners.",
        "data_buyers": ["Advertising networks"],
        "data_storage": "Retained for 3 years.",
        "main_concerns": ["Advertising", "Retention"],
        "user_rights": "Access on request.",
        "summary": "Ad-funded. Long retention."
    }"#;

    #[test]
    fn test_parses_plain_json() {
        let analysis = parse_privacy_analysis(REPLY).unwrap();
        assert_eq!(analysis.privacy_score, 35);
        assert_eq!(analysis.terms_analysis.bad.len(), 1);
        assert_eq!(analysis.main_concerns, vec!["Advertising", "Retention"]);
    }

    #[test]
    fn test_parses_fenced_json_with_prose() {
        let text = format!("Here is the analysis:\n```json\n{}\n```\nLet me know!", REPLY);
        assert!(parse_privacy_analysis(&text).is_ok());
    }

    #[test]
    fn test_parses_embedded_object() {
        let text = format!("Result: {} (end)", REPLY);
        assert!(parse_privacy_analysis(&text).is_ok());
    }

    #[test]
    fn test_non_json_is_rejected() {
        assert_eq!(
            parse_privacy_analysis("I could not access that page."),
            Err(SchemaError::NoJson)
        );
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = parse_privacy_analysis(r#"{"privacy_score": 40, "summary": }"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }

    #[test]
    fn test_partial_structure_is_rejected() {
        let err = parse_privacy_analysis(r#"{"privacy_score": 50, "summary": "ok"}"#).unwrap_err();
        match err {
            SchemaError::Violations(errors) => assert!(!errors.is_empty()),
            other => panic!("Expected violations, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_key_is_rejected() {
        let text = REPLY.replacen('{', r#"{"error": "Response parsing failed","#, 1);
        assert!(matches!(
            parse_privacy_analysis(&text),
            Err(SchemaError::Violations(_))
        ));
    }
}
