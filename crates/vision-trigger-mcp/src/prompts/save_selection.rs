//! Prompt: save_selection — Save the user's picked images for later turns.

use serde_json::Value;

use crate::types::{McpResult, PromptGetResult};

pub fn expand(args: Value) -> McpResult<PromptGetResult> {
    let label = args
        .get("label")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");

    let label_line = if label.is_empty() {
        "Omit the label; the last planned target or the session topic will be used.".to_string()
    } else {
        format!("Save them under the label \"{label}\".")
    };

    let text = format!(
        "The user has chosen the images they like.\n\n\
         Please:\n\
         1. Collect the storage key and URL of every chosen image\n\
         2. Call reference_save with those locations. {label_line}\n\
         3. Record where the images came from in source (provider, query, backend)\n\
         4. Confirm the saved label so the user knows how to ask for it again"
    );

    Ok(PromptGetResult::user(
        "Guide for saving selected images as a reusable reference",
        text,
    ))
}
