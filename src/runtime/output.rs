//! Model output normalization
//!
//! Model responses arrive as a JSON literal, a fenced ```json block, or
//! plain prose. All three normalize to a JSON value; prose is wrapped as
//! `{"TextOutput": <text>}` so downstream steps always see structured data.

use serde_json::{json, Value};

use crate::util::TEXT_OUTPUT_KEY;

/// Parse a model response into a JSON value.
///
/// Never fails: anything that isn't parseable JSON becomes a text-wrapped
/// object.
pub fn parse_model_output(text: &str) -> Value {
    let trimmed = text.trim();
    let body = strip_fences(trimmed);

    if looks_like_json(body) {
        if let Ok(value) = serde_json::from_str(body) {
            return value;
        }
    }

    json!({ TEXT_OUTPUT_KEY: trimmed })
}

/// Strip a leading/trailing markdown fence (``` or ```json) if present.
fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn looks_like_json(text: &str) -> bool {
    matches!(text.as_bytes().first(), Some(b'{') | Some(b'['))
}

/// Whether a step result carries no usable data.
pub fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Unwrap a single-element array to its sole element; anything else passes
/// through. Step dispatchers return arrays by convention, so per-element
/// iteration results would otherwise nest one level too deep.
pub fn unwrap_single(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}
