//! JSON Schema validation for model replies.
//!
//! Replies are validated against spec/privacy_analysis.schema.json before
//! deserialization, so unknown or missing keys surface as explicit schema
//! errors instead of silently defaulted fields.

use std::sync::OnceLock;

use super::SchemaError;

/// Embedded analysis schema (loaded at compile time).
const ANALYSIS_SCHEMA_JSON: &str = include_str!("../../../../spec/privacy_analysis.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(ANALYSIS_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a reply value against the analysis schema.
///
/// Returns every violation, formatted as `"<message> at <instance path>"`.
pub fn validate_analysis_schema(value: &serde_json::Value) -> Result<(), SchemaError> {
    let validator = get_validator()?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Violations(errors))
    }
}
