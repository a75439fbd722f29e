//! Post-processing of LLM replies into the field triple.

use serde_json::Value;

use super::{ExtractError, ExtractedFields};

/// Strips a surrounding markdown code fence, with or without a language
/// tag. Models frequently wrap their JSON in ```json ... ``` despite being
/// asked not to.
pub fn strip_code_fence(content: &str) -> &str {
    let mut content = content.trim();

    if let Some(rest) = content.strip_prefix("```json") {
        content = rest;
    } else if let Some(rest) = content.strip_prefix("```") {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest;
    }

    content.trim()
}

/// Parses a reply into the field triple. Missing keys map to `None`;
/// string values pass through, numbers are stringified, anything else is
/// treated as absent.
pub fn parse_fields(content: &str) -> Result<ExtractedFields, ExtractError> {
    let cleaned = strip_code_fence(content);

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| ExtractError::ResponseParse(e.to_string()))?;

    Ok(ExtractedFields {
        merchant: field_string(&value, "merchant"),
        date: field_string(&value, "date"),
        total: field_string(&value, "total"),
    })
}

fn field_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
