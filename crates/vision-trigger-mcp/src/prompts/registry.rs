//! Prompt registration and dispatch.

use serde_json::Value;

use crate::types::{McpError, McpResult, PromptArgument, PromptDefinition, PromptGetResult};

use super::{save_selection, visual_turn};

pub struct PromptRegistry;

impl PromptRegistry {
    pub fn list_prompts() -> Vec<PromptDefinition> {
        vec![
            PromptDefinition {
                name: "visual_turn".to_string(),
                description: Some(
                    "Guide for handling one user turn that may need reference images".to_string(),
                ),
                arguments: Some(vec![PromptArgument {
                    name: "utterance".to_string(),
                    description: Some("The user's message for this turn".to_string()),
                    required: true,
                }]),
            },
            PromptDefinition {
                name: "save_selection".to_string(),
                description: Some(
                    "Guide for saving the images the user picked as a reusable reference"
                        .to_string(),
                ),
                arguments: Some(vec![PromptArgument {
                    name: "label".to_string(),
                    description: Some("Label to save under".to_string()),
                    required: false,
                }]),
            },
        ]
    }

    pub fn get(name: &str, arguments: Option<Value>) -> McpResult<PromptGetResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "visual_turn" => visual_turn::expand(args),
            "save_selection" => save_selection::expand(args),
            _ => Err(McpError::PromptNotFound(name.to_string())),
        }
    }
}
