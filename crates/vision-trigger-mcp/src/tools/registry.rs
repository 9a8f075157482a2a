//! Tool registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    reference_lookup, reference_save, session_end, session_start, vision_plan, vision_trigger,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            vision_trigger::definition(),
            vision_plan::definition(),
            reference_lookup::definition(),
            reference_save::definition(),
            session_start::definition(),
            session_end::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        session: &Arc<Mutex<PolicySessionManager>>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "vision_trigger" => vision_trigger::execute(args, session).await,
            "vision_plan" => vision_plan::execute(args, session).await,
            "reference_lookup" => reference_lookup::execute(args, session).await,
            "reference_save" => reference_save::execute(args, session).await,
            "session_start" => session_start::execute(args, session).await,
            "session_end" => session_end::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
