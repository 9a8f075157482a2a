//! Tool: session_start — Start a new planning session.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct StartParams {
    #[serde(default)]
    topic: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "session_start".to_string(),
        description: Some("Start a new planning session".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "What the session is about; used as the fallback label when saving references"
                }
            }
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: StartParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let mut session = session.lock().await;
    let session_id = session.start_session(params.topic);

    Ok(ToolCallResult::json(&json!({
        "session_id": session_id,
        "topic": session.topic(),
        "status": "started"
    })))
}
