//! Tool: reference_lookup — Find stored references for visual targets.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use vision_trigger::VisualTarget;

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct LookupParams {
    targets: Vec<String>,
    #[serde(default)]
    max_results: Option<usize>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "reference_lookup".to_string(),
        description: Some("Find saved image references whose label matches any target".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "targets": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Visual target phrases, e.g. [\"duck lamp\"]"
                },
                "max_results": { "type": "integer", "minimum": 1, "description": "Maximum references to return" }
            },
            "required": ["targets"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: LookupParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let targets: Vec<VisualTarget> = params
        .targets
        .iter()
        .filter_map(|t| VisualTarget::new(t))
        .collect();

    let session = session.lock().await;
    let mut references = session.store().matching(&targets);
    let total = references.len();
    if let Some(max) = params.max_results {
        references.truncate(max);
    }

    Ok(ToolCallResult::json(&json!({
        "total": total,
        "references": references,
    })))
}
