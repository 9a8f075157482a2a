//! Prompt: visual_turn — Walk an agent through detect, plan, dispatch, save.

use serde_json::Value;

use crate::types::{McpError, McpResult, PromptGetResult};

pub fn expand(args: Value) -> McpResult<PromptGetResult> {
    let utterance = args
        .get("utterance")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| McpError::InvalidParams("utterance is required".to_string()))?;

    let text = format!(
        "The user said: \"{utterance}\"\n\n\
         Please:\n\
         1. Call vision_plan with this utterance\n\
         2. If the plan mode is \"none\", answer normally without images\n\
         3. If the mode is \"reuse\", show the saved references in the plan and skip searching\n\
         4. If the mode is \"fetch\", search for candidate images of each target, rank them with \
         the plan's backend, drop anything scoring below the threshold, and keep at most \
         max_candidates\n\
         5. If the plan carries warnings, mention that saved references could not be checked\n\
         6. When the user picks images, call reference_save with their locations"
    );

    Ok(PromptGetResult::user(
        "Guide for handling a turn that may need reference images",
        text,
    ))
}
