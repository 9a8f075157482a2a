//! Structural checks on inbound requests.

use crate::types::{JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Reject requests with the wrong protocol version, an empty method, or a
/// method in the reserved `rpc.` namespace.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    if request.method.starts_with("rpc.") {
        return Err(McpError::InvalidRequest(format!(
            "Method name {} is reserved",
            request.method
        )));
    }

    Ok(())
}
