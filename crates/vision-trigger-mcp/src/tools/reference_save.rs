//! Tool: reference_save — Save user-selected images under a label.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use vision_trigger::{NewReference, ReferenceLocation, ReferenceSource};

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct SaveParams {
    #[serde(default)]
    label: Option<String>,
    locations: Vec<ReferenceLocation>,
    #[serde(default)]
    source: ReferenceSource,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "reference_save".to_string(),
        description: Some(
            "Save selected images as a reference. Without a label, the last turn's target or the session topic is used"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "Label to save under" },
                "locations": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "storage_key": { "type": "string" },
                            "url": { "type": "string" }
                        },
                        "required": ["storage_key", "url"]
                    }
                },
                "source": {
                    "type": "object",
                    "properties": {
                        "provider": { "type": "string" },
                        "query": { "type": "string" },
                        "backend": { "type": "string", "enum": ["similarity_model", "vision_language_model"] }
                    }
                }
            },
            "required": ["locations"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: SaveParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let session = session.lock().await;
    let stored = session.save_reference(
        params.label.as_deref(),
        NewReference {
            label: String::new(),
            locations: params.locations,
            source: params.source,
        },
    )?;

    Ok(ToolCallResult::json(&json!({
        "id": stored.id,
        "label": stored.label,
        "locations": stored.locations.len(),
        "session_id": session.current_session_id(),
    })))
}
