//! Resources: vtp://references, vtp://reference/{id}, vtp://label/{label}

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::json;

use vision_trigger::VisualTarget;

use crate::session::PolicySessionManager;
use crate::types::{McpError, McpResult, ReadResourceResult};

const RECENT_LIMIT: usize = 20;

pub async fn read_reference(
    id: u64,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;
    let reference = session.reference(id)?;

    Ok(ReadResourceResult::json(
        &format!("vtp://reference/{id}"),
        &serde_json::to_value(&reference)?,
    ))
}

pub async fn read_label(
    label: &str,
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ReadResourceResult> {
    let target = VisualTarget::new(label)
        .ok_or_else(|| McpError::InvalidParams("Label must not be empty".to_string()))?;

    let session = session.lock().await;
    let references = session.store().matching(std::slice::from_ref(&target));

    let content = json!({
        "label": target,
        "count": references.len(),
        "references": references,
    });

    Ok(ReadResourceResult::json(
        &format!("vtp://label/{}", urlencoding::encode(target.as_str())),
        &content,
    ))
}

pub async fn read_recent(
    session: &Arc<Mutex<PolicySessionManager>>,
) -> McpResult<ReadResourceResult> {
    let session = session.lock().await;
    let store = session.store();
    let recent = store.recent(RECENT_LIMIT);

    let content = json!({
        "total": store.count(),
        "count": recent.len(),
        "references": recent,
    });

    Ok(ReadResourceResult::json("vtp://references", &content))
}
