//! Integration tests for vision-trigger-mcp, driving the protocol handler
//! with raw JSON-RPC messages.

use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use vision_trigger::{PolicyConfig, VisionTriggerPolicy};
use vision_trigger_mcp::protocol::ProtocolHandler;
use vision_trigger_mcp::session::PolicySessionManager;
use vision_trigger_mcp::transport::framing;
use vision_trigger_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

fn session_with(config: PolicyConfig) -> Arc<Mutex<PolicySessionManager>> {
    let policy = VisionTriggerPolicy::new(config).unwrap();
    Arc::new(Mutex::new(PolicySessionManager::new(policy, None)))
}

fn default_handler() -> ProtocolHandler {
    ProtocolHandler::new(session_with(PolicyConfig::default()))
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an initialize request.
fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

/// Send a JSON-RPC message through the handler and return the response.
async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler.handle_message(parsed).await
}

/// Send and unwrap the response.
async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

/// Call a tool and parse the JSON payload of its first text block.
async fn call_tool(handler: &ProtocolHandler, name: &str, arguments: Value) -> Value {
    let resp = send_unwrap(
        handler,
        mcp_request(10, "tools/call", json!({ "name": name, "arguments": arguments })),
    )
    .await;
    let text = resp["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("tool {name} returned no text: {resp}"));
    serde_json::from_str(text).unwrap()
}

/// Read a resource and parse its JSON body.
async fn read_resource(handler: &ProtocolHandler, uri: &str) -> Value {
    let resp = send_unwrap(handler, mcp_request(20, "resources/read", json!({ "uri": uri }))).await;
    let text = resp["result"]["contents"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("resource {uri} returned no text: {resp}"));
    serde_json::from_str(text).unwrap()
}

fn duck_lamp_location() -> Value {
    json!([{ "storage_key": "refs/duck-lamp/0.png", "url": "https://cdn.example.com/duck-lamp/0.png" }])
}

// ═══════════════════════════════════════════════════════
// PROTOCOL
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_initialize_handshake() {
    let handler = default_handler();
    let resp = send_unwrap(&handler, init_request()).await;
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "vision-trigger-mcp");
    assert!(resp["result"]["capabilities"]["tools"].is_object());

    // Notifications are never answered.
    let notif = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    assert!(send(&handler, notif).await.is_none());

    let ping = send_unwrap(&handler, mcp_request(1, "ping", json!({}))).await;
    assert_eq!(ping["result"], json!({}));
}

#[tokio::test]
async fn test_malformed_json() {
    let result = framing::parse_message(r#"{"broken":"#);
    let err = result.unwrap_err();
    assert_eq!(err.code(), -32700);

    assert!(framing::parse_message("").is_err());
    assert!(framing::parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"#).is_err());
}

#[tokio::test]
async fn test_unknown_method_and_tool() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let resp = send_unwrap(&handler, mcp_request(1, "vision/teleport", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "tools/call", json!({ "name": "vision_capture", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32803);

    let resp = send_unwrap(
        &handler,
        mcp_request(3, "prompts/get", json!({ "name": "observe" })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32804);
}

#[tokio::test]
async fn test_wrong_jsonrpc_version() {
    let handler = default_handler();
    let msg = json!({ "jsonrpc": "1.0", "id": 5, "method": "ping" });
    let resp = send_unwrap(&handler, msg).await;
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["id"], 5);
}

#[tokio::test]
async fn test_listings() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let tools = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    for expected in [
        "vision_trigger",
        "vision_plan",
        "reference_lookup",
        "reference_save",
        "session_start",
        "session_end",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }

    let resources = send_unwrap(&handler, mcp_request(2, "resources/list", json!({}))).await;
    assert_eq!(resources["result"]["resources"].as_array().unwrap().len(), 3);

    let templates =
        send_unwrap(&handler, mcp_request(3, "resources/templates/list", json!({}))).await;
    assert_eq!(
        templates["result"]["resourceTemplates"].as_array().unwrap().len(),
        2
    );

    let prompts = send_unwrap(&handler, mcp_request(4, "prompts/list", json!({}))).await;
    assert_eq!(prompts["result"]["prompts"].as_array().unwrap().len(), 2);
}

// ═══════════════════════════════════════════════════════
// TRIGGER AND PLAN SCENARIOS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_lexical_trigger_fetches_with_default_backend() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let result = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "show me pictures of a duck lamp" }),
    )
    .await;
    assert_eq!(result["decision"]["invoke"], true);
    assert_eq!(result["decision"]["reason"], "lexical");
    assert_eq!(result["plan"]["mode"], "fetch");
    assert_eq!(result["plan"]["backend"], "similarity_model");
    assert!(result["plan"].get("references").is_none());
    assert_eq!(result["warnings"], json!([]));
}

#[tokio::test]
async fn test_style_cue_flips_backend() {
    let handler = ProtocolHandler::new(session_with(PolicyConfig {
        visual_concept_allowset: vec!["duck".to_string()],
        style_cue_words: vec!["style".to_string()],
        ..PolicyConfig::default()
    }));
    send_unwrap(&handler, init_request()).await;

    let result = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "I want a cute duck design with smooth style" }),
    )
    .await;
    assert_eq!(result["decision"]["reason"], "visualizable");
    assert_eq!(result["decision"]["targets"][0], "duck design");
    assert_eq!(result["plan"]["mode"], "fetch");
    assert_eq!(result["plan"]["backend"], "vision_language_model");
}

#[tokio::test]
async fn test_no_trigger() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let decision = call_tool(
        &handler,
        "vision_trigger",
        json!({ "utterance": "write me a poem about the ocean" }),
    )
    .await;
    assert_eq!(decision["invoke"], false);
    assert_eq!(decision["reason"], "none");
    assert_eq!(decision["targets"], json!([]));

    let result = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "write me a poem about the ocean" }),
    )
    .await;
    assert_eq!(result["plan"]["mode"], "none");
    assert!(result["plan"].get("backend").is_none());
}

#[tokio::test]
async fn test_save_then_reuse() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let first = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "show me pictures of a duck lamp" }),
    )
    .await;
    assert_eq!(first["plan"]["mode"], "fetch");

    // No label: falls back to the last planned target.
    let saved = call_tool(
        &handler,
        "reference_save",
        json!({
            "locations": duck_lamp_location(),
            "source": { "provider": "test", "backend": "similarity_model" }
        }),
    )
    .await;
    assert_eq!(saved["id"], 1);
    assert_eq!(saved["label"], "duck lamp");

    let second = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "show me pictures of a duck lamp" }),
    )
    .await;
    assert_eq!(second["plan"]["mode"], "reuse");
    assert_eq!(second["plan"]["references"][0]["id"], 1);
    assert!(second["plan"].get("backend").is_none());

    // Declining reuse for one call still fetches.
    let declined = call_tool(
        &handler,
        "vision_plan",
        json!({ "utterance": "show me pictures of a duck lamp", "use_saved_first": false }),
    )
    .await;
    assert_eq!(declined["plan"]["mode"], "fetch");

    let lookup = call_tool(&handler, "reference_lookup", json!({ "targets": ["Duck Lamp"] })).await;
    assert_eq!(lookup["total"], 1);

    let stats = read_resource(&handler, "vtp://stats").await;
    assert_eq!(stats["turns"]["turns"], 3);
    assert_eq!(stats["turns"]["reuse"], 1);
    assert_eq!(stats["turns"]["fetch"], 2);
    assert_eq!(stats["total_references"], 1);
}

#[tokio::test]
async fn test_save_uses_session_topic() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let started = call_tool(&handler, "session_start", json!({ "topic": "Desk Lamp" })).await;
    assert_eq!(started["session_id"], 2);

    let saved = call_tool(
        &handler,
        "reference_save",
        json!({ "locations": duck_lamp_location() }),
    )
    .await;
    assert_eq!(saved["label"], "desk lamp");

    let ended = call_tool(&handler, "session_end", json!({})).await;
    assert_eq!(ended["status"], "ended");
    assert_eq!(ended["total_references"], 1);
}

// ═══════════════════════════════════════════════════════
// INVALID INPUT
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_invalid_params() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "tools/call", json!({ "name": "vision_plan", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = send_unwrap(&handler, mcp_request(2, "tools/call", Value::Null)).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_save_without_label_or_context() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(
            1,
            "tools/call",
            json!({ "name": "reference_save", "arguments": { "locations": duck_lamp_location() } }),
        ),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = send_unwrap(
        &handler,
        mcp_request(
            2,
            "tools/call",
            json!({ "name": "reference_save", "arguments": { "label": "chair", "locations": [] } }),
        ),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_resources() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let config = read_resource(&handler, "vtp://config").await;
    assert_eq!(config["source"], "built-in defaults");
    assert_eq!(config["policy"]["backend_default"], "similarity_model");

    call_tool(
        &handler,
        "reference_save",
        json!({ "label": "duck lamp", "locations": duck_lamp_location() }),
    )
    .await;

    let reference = read_resource(&handler, "vtp://reference/1").await;
    assert_eq!(reference["label"], "duck lamp");

    let by_label = read_resource(&handler, "vtp://label/duck%20lamp").await;
    assert_eq!(by_label["count"], 1);

    call_tool(
        &handler,
        "reference_save",
        json!({ "label": "L-shaped bracket", "locations": duck_lamp_location() }),
    )
    .await;
    let escaped = read_resource(&handler, "vtp://label/l%2Dshaped%20bracket").await;
    assert_eq!(escaped["count"], 1);
    assert_eq!(escaped["references"][0]["label"], "l-shaped bracket");

    let recent = read_resource(&handler, "vtp://references").await;
    assert_eq!(recent["total"], 2);

    let missing = send_unwrap(
        &handler,
        mcp_request(1, "resources/read", json!({ "uri": "vtp://reference/42" })),
    )
    .await;
    assert_eq!(missing["error"]["code"], -32850);

    let bad_label = send_unwrap(
        &handler,
        mcp_request(4, "resources/read", json!({ "uri": "vtp://label/%FF%FE" })),
    )
    .await;
    assert_eq!(bad_label["error"]["code"], -32602);

    let bad_id = send_unwrap(
        &handler,
        mcp_request(2, "resources/read", json!({ "uri": "vtp://reference/abc" })),
    )
    .await;
    assert_eq!(bad_id["error"]["code"], -32602);

    let unknown = send_unwrap(
        &handler,
        mcp_request(3, "resources/read", json!({ "uri": "vtp://unknown" })),
    )
    .await;
    assert_eq!(unknown["error"]["code"], -32802);
}

#[tokio::test]
async fn test_prompts() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(
            1,
            "prompts/get",
            json!({ "name": "visual_turn", "arguments": { "utterance": "a retro chair" } }),
        ),
    )
    .await;
    let text = resp["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("a retro chair"));

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "prompts/get", json!({ "name": "save_selection" })),
    )
    .await;
    assert!(resp["result"]["messages"].is_array());
}

// ═══════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_policy_file_is_loaded() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "visual_concept_allowset: [chair]\nbackend_default: vision_language_model\nuse_saved_first: false"
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let session = PolicySessionManager::open(Some(&path)).unwrap();
    let handler = ProtocolHandler::new(Arc::new(Mutex::new(session)));
    send_unwrap(&handler, init_request()).await;

    let result = call_tool(&handler, "vision_plan", json!({ "utterance": "a wooden chair" })).await;
    assert_eq!(result["decision"]["reason"], "visualizable");
    assert_eq!(result["plan"]["backend"], "vision_language_model");
}

#[test]
fn test_invalid_policy_file_rejected() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "lexical_patterns: [\"([\"]").unwrap();
    let path = file.path().to_str().unwrap().to_string();
    assert!(PolicySessionManager::open(Some(&path)).is_err());

    assert!(PolicySessionManager::open(Some("/definitely/not/here/policy.yaml")).is_err());
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_plans() {
    let handler = Arc::new(default_handler());
    send_unwrap(&handler, init_request()).await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let handler = handler.clone();
        tasks.push(tokio::spawn(async move {
            let utterance = if i % 2 == 0 {
                "show me pictures of a duck lamp"
            } else {
                "write me a poem about the ocean"
            };
            call_tool(&handler, "vision_plan", json!({ "utterance": utterance })).await
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let result = task.await.unwrap();
        if i % 2 == 0 {
            assert_eq!(result["decision"]["invoke"], true, "task {i}: {result}");
            assert_eq!(result["plan"]["mode"], "fetch", "task {i}: {result}");
            assert_eq!(result["plan"]["targets"], json!(["duck lamp"]));
        } else {
            assert_eq!(result["decision"]["invoke"], false, "task {i}: {result}");
            assert_eq!(result["plan"]["mode"], "none", "task {i}: {result}");
        }
    }

    let stats = read_resource(&handler, "vtp://stats").await;
    assert_eq!(stats["turns"]["turns"], 16);
    assert_eq!(stats["turns"]["triggered"], 8);
}
