//! Resource: vtp://config

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::json;

use crate::session::PolicySessionManager;
use crate::types::{McpResult, ReadResourceResult};

pub async fn read_config(
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;

    let content = json!({
        "source": session
            .policy_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string()),
        "policy": session.policy().config(),
    });

    Ok(ReadResourceResult::json("vtp://config", &content))
}
