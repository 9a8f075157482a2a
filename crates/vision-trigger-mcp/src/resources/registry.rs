//! Resource registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::session::PolicySessionManager;
use crate::types::{
    McpError, McpResult, ReadResourceResult, ResourceDefinition, ResourceTemplateDefinition,
};

use super::{config, references, stats, templates};

pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn list_templates() -> Vec<ResourceTemplateDefinition> {
        templates::list_templates()
    }

    pub fn list_resources() -> Vec<ResourceDefinition> {
        templates::list_resources()
    }

    pub async fn read(
        uri: &str,
        session: &Arc<Mutex<PolicySessionManager>>,
    ) -> McpResult<ReadResourceResult> {
        if let Some(id_str) = uri.strip_prefix("vtp://reference/") {
            let id: u64 = id_str
                .parse()
                .map_err(|_| McpError::InvalidParams(format!("Invalid reference ID: {id_str}")))?;
            references::read_reference(id, session).await
        } else if let Some(label) = uri.strip_prefix("vtp://label/") {
            references::read_label(&decode_label(label)?, session).await
        } else if uri == "vtp://references" {
            references::read_recent(session).await
        } else if uri == "vtp://config" {
            config::read_config(session).await
        } else if uri == "vtp://stats" {
            stats::read_stats(session).await
        } else {
            Err(McpError::ResourceNotFound(uri.to_string()))
        }
    }
}

/// Percent-decode a label from a URI; `+` also stands for a space.
fn decode_label(raw: &str) -> McpResult<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|label| label.into_owned())
        .map_err(|e| McpError::InvalidParams(format!("Invalid label encoding {raw:?}: {e}")))
}
