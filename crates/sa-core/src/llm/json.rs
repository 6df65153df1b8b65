//! Pulling JSON objects out of free-form model replies
//!
//! Models are asked to answer with a JSON object but frequently wrap it in a
//! markdown fence or surround it with prose.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Return the most likely JSON payload inside `text`
///
/// A fenced json block wins; otherwise the span from the first `{` to the
/// last `}`; otherwise the trimmed input.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let inner = &text[start + "```json".len()..];
        if let Some(end) = inner.find("```") {
            return inner[..end].trim();
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Parse the JSON payload of a model reply into `T`
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let block = extract_json_block(text);
    serde_json::from_str(block).map_err(|e| Error::ModelOutput(e.to_string()))
}
