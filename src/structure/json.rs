//! Best-effort extraction of a JSON object from free-form model output.
//!
//! Models asked for "only JSON" still wrap replies in prose or code fences.
//! The reply is accepted as-is when it parses; otherwise the first balanced
//! top-level `{...}` span is cut out and parsed on its own.

use crate::errors::StructureError;
use crate::utils::looks_truncated;
use serde_json::{Map, Value};

/// Byte range of the first balanced `{...}` span, ignoring braces inside string literals.
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Classify a reply with no balanced object: an object opened after some
/// prose and then cut off is still a truncation.
fn unbalanced(text: &str, direct: serde_json::Error) -> StructureError {
    if looks_truncated(&direct) {
        return StructureError::Truncated(direct);
    }
    let tail = text
        .find('{')
        .and_then(|start| serde_json::from_str::<Value>(&text[start..]).err());
    match tail {
        Some(e) if looks_truncated(&e) => StructureError::Truncated(e),
        _ => StructureError::NoObject,
    }
}

/// Parse a model reply into a JSON object.
///
/// # Errors
///
/// - [`StructureError::Empty`] for a blank reply
/// - [`StructureError::Truncated`] when the reply ends inside an unterminated object
/// - [`StructureError::NoObject`] when no `{...}` span exists
/// - [`StructureError::Json`] when the embedded span is not valid JSON
/// - [`StructureError::NotObject`] when the reply is valid JSON but not an object
pub fn best_effort_json(reply: &str) -> Result<Map<String, Value>, StructureError> {
    let text = reply.trim();
    if text.is_empty() {
        return Err(StructureError::Empty);
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(direct) => match find_balanced_object(text) {
            Some(span) => serde_json::from_str::<Value>(span)?,
            None => return Err(unbalanced(text, direct)),
        },
    };

    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(StructureError::NotObject),
    }
}
