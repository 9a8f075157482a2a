//! Resource: vtp://stats

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::json;

use crate::session::PolicySessionManager;
use crate::types::{McpResult, ReadResourceResult};

pub async fn read_stats(
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;
    let store = session.store();

    let content = json!({
        "session_id": session.current_session_id(),
        "topic": session.topic(),
        "turns": session.stats(),
        "total_references": store.count(),
        "labels": store.labels(),
        "started_at": session.started_at(),
        "store_created_at": store.created_at(),
    });

    Ok(ReadResourceResult::json("vtp://stats", &content))
}
