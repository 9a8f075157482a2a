//! Tool: vision_plan — Detect and plan one turn against the reference store.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct PlanParams {
    utterance: String,
    #[serde(default)]
    use_saved_first: Option<bool>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "vision_plan".to_string(),
        description: Some(
            "Plan a turn: reuse saved references, fetch new candidates with a scoring backend, or do nothing"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "utterance": { "type": "string", "description": "The user's message for this turn" },
                "use_saved_first": {
                    "type": "boolean",
                    "description": "Override the configured preference for reusing saved references"
                }
            },
            "required": ["utterance"]
        }),
    }
}

pub async fn execute(
    args: Value,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ToolCallResult> {
    let params: PlanParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    // The lookup may await; don't hold the session lock across it.
    let (policy, store, session_id) = {
        let session = session.lock().await;
        (
            session.policy().clone(),
            session.store(),
            session.current_session_id(),
        )
    };

    let decision = policy.detect_trigger(&params.utterance);
    let use_saved_first = params
        .use_saved_first
        .unwrap_or(policy.compiled().use_saved_first);
    let outcome = policy
        .build_plan_with(&decision, store.as_ref(), use_saved_first)
        .await;

    session
        .lock()
        .await
        .record_turn(session_id, &decision, &outcome);

    Ok(ToolCallResult::json(&json!({
        "decision": decision,
        "plan": outcome.plan,
        "warnings": outcome.warnings,
    })))
}
