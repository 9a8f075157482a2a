//! Tool: vision_trigger — Decide whether an utterance calls for vision tooling.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct TriggerParams {
    utterance: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "vision_trigger".to_string(),
        description: Some(
            "Decide whether a user utterance should invoke image tooling, and extract the visual targets"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "utterance": { "type": "string", "description": "The user's message for this turn" }
            },
            "required": ["utterance"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: TriggerParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let session = session.lock().await;
    let decision = session.policy().detect_trigger(&params.utterance);

    Ok(ToolCallResult::json(&decision))
}
