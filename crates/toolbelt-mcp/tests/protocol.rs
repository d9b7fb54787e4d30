//! Protocol-level integration tests for toolbelt-mcp.
//!
//! Every test drives the server the way a client would: JSON-RPC messages in,
//! JSON-RPC messages out.

use std::sync::Arc;

use serde_json::{json, Value};

use toolbelt_mcp::config::ServerConfig;
use toolbelt_mcp::protocol::ProtocolHandler;
use toolbelt_mcp::transport::StdioTransport;
use toolbelt_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

fn handler_with(config: ServerConfig) -> ProtocolHandler {
    let registry = toolbelt_mcp::build_registry(&config).unwrap();
    ProtocolHandler::new(Arc::new(registry))
}

fn handler() -> ProtocolHandler {
    handler_with(ServerConfig::default())
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

async fn call_tool(handler: &ProtocolHandler, name: &str, arguments: Value) -> Value {
    let msg = mcp_request(
        1,
        "tools/call",
        json!({ "name": name, "arguments": arguments }),
    );
    send_unwrap(handler, msg).await["result"].clone()
}

fn first_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap_or_default()
}

// ═══════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_initialize_handshake() {
    let h = handler();
    let resp = send_unwrap(&h, init_request()).await;
    assert_eq!(resp["id"], 0);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "toolbelt-mcp");
    assert!(resp["result"]["capabilities"]["tools"].is_object());

    let notif = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    assert!(send(&h, notif).await.is_none());
}

#[tokio::test]
async fn test_initialize_requires_params() {
    let h = handler();
    let resp = send_unwrap(&h, json!({ "jsonrpc": "2.0", "id": 3, "method": "initialize" })).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_ping_and_shutdown() {
    let h = handler();
    let resp = send_unwrap(&h, mcp_request(5, "ping", json!({}))).await;
    assert_eq!(resp["result"], json!({}));
    let resp = send_unwrap(&h, mcp_request(6, "shutdown", json!({}))).await;
    assert_eq!(resp["result"], json!({}));
}

#[tokio::test]
async fn test_unknown_method() {
    let h = handler();
    let resp = send_unwrap(&h, mcp_request(9, "tools/explode", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["id"], 9);
}

#[tokio::test]
async fn test_wrong_jsonrpc_version() {
    let h = handler();
    let msg = json!({ "jsonrpc": "1.0", "id": 2, "method": "ping" });
    let resp = send_unwrap(&h, msg).await;
    assert_eq!(resp["error"]["code"], -32600);
}

#[tokio::test]
async fn test_cancellation_notification_is_silent() {
    let h = handler();
    let notif = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 4, "reason": "user aborted" }
    });
    assert!(send(&h, notif).await.is_none());
}

// ═══════════════════════════════════════════════════════
// LISTINGS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_tools_list_order_and_schemas() {
    let h = handler();
    let resp = send_unwrap(&h, mcp_request(1, "tools/list", json!({}))).await;
    let tools = resp["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "greet",
            "calculate",
            "current_time",
            "geocode",
            "get_weather",
            "generate_image"
        ]
    );

    let calculate = &tools[1];
    assert_eq!(
        calculate["inputSchema"]["required"],
        json!(["number1", "number2", "operator"])
    );
    assert_eq!(calculate["outputSchema"]["properties"]["result"]["type"], "number");
    assert!(tools[3].get("outputSchema").is_some());
    assert!(tools[4].get("outputSchema").is_none());
}

#[tokio::test]
async fn test_resources_and_templates_listed_separately() {
    let h = handler();
    let resp = send_unwrap(&h, mcp_request(1, "resources/list", json!({}))).await;
    let resources = resp["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["uri"], "server://info");
    assert_eq!(resources[0]["mimeType"], "application/json");

    let resp = send_unwrap(&h, mcp_request(2, "resources/templates/list", json!({}))).await;
    let templates = resp["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["uriTemplate"], "greeting://{name}");
}

#[tokio::test]
async fn test_prompts_list_arguments() {
    let h = handler();
    let resp = send_unwrap(&h, mcp_request(1, "prompts/list", json!({}))).await;
    let prompts = resp["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts[0]["name"], "code_review");
    let args = prompts[0]["arguments"].as_array().unwrap();
    assert_eq!(args[0]["name"], "code");
    assert_eq!(args[0]["required"], true);
    assert_eq!(args[1]["required"], false);
    assert_eq!(prompts[1]["name"], "weather_briefing");
}

// ═══════════════════════════════════════════════════════
// TOOLS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_calculator_addition() {
    let h = handler();
    let result = call_tool(
        &h,
        "calculate",
        json!({ "number1": 10, "number2": 5, "operator": "+" }),
    )
    .await;
    assert_eq!(result["content"].as_array().unwrap().len(), 1);
    assert_eq!(first_text(&result), "10 + 5 = 15");
    assert_eq!(result["structuredContent"]["result"], 15.0);
    assert!(result.get("isError").is_none());
}

#[tokio::test]
async fn test_calculator_divide_by_zero() {
    let h = handler();
    let result = call_tool(
        &h,
        "calculate",
        json!({ "number1": 10, "number2": 0, "operator": "/" }),
    )
    .await;
    assert_eq!(result["isError"], true);
    assert_eq!(first_text(&result), "Cannot divide by zero");
}

#[tokio::test]
async fn test_calculator_bad_operator() {
    let h = handler();
    let result = call_tool(
        &h,
        "calculate",
        json!({ "number1": 1, "number2": 2, "operator": "%" }),
    )
    .await;
    assert_eq!(result["isError"], true);
    assert!(first_text(&result).contains("operator"));
}

#[tokio::test]
async fn test_greet_defaults_to_english() {
    let h = handler();
    let result = call_tool(&h, "greet", json!({ "name": "Alice" })).await;
    assert_eq!(first_text(&result), "Hello, Alice!");
    assert_eq!(result["structuredContent"]["greeting"], "Hello, Alice!");

    let result = call_tool(&h, "greet", json!({ "name": "민수", "language": "ko" })).await;
    assert_eq!(first_text(&result), "안녕하세요, 민수님!");
}

#[tokio::test]
async fn test_greet_missing_name() {
    let h = handler();
    let result = call_tool(&h, "greet", json!({})).await;
    assert_eq!(result["isError"], true);
    assert!(first_text(&result).contains("name"));
}

#[tokio::test]
async fn test_current_time_unknown_zone() {
    let h = handler();
    let result = call_tool(&h, "current_time", json!({ "timezone": "Nowhere/Land" })).await;
    assert_eq!(result["isError"], true);
    assert_eq!(first_text(&result), "Unknown timezone 'Nowhere/Land'");

    let result = call_tool(&h, "current_time", json!({})).await;
    assert!(first_text(&result).ends_with("(Asia/Seoul)"));
}

#[tokio::test]
async fn test_weather_out_of_range_never_reaches_network() {
    let h = handler();
    let result = call_tool(
        &h,
        "get_weather",
        json!({ "latitude": 91, "longitude": 0 }),
    )
    .await;
    assert_eq!(result["isError"], true);
    assert!(first_text(&result).contains("latitude"));
}

#[tokio::test]
async fn test_unknown_tool_is_error_result() {
    let h = handler();
    let result = call_tool(&h, "teleport", json!({})).await;
    assert_eq!(result["isError"], true);
    assert_eq!(first_text(&result), "unknown capability: tool/teleport");
}

#[tokio::test]
async fn test_missing_tool_call_params() {
    let h = handler();
    let resp = send_unwrap(&h, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/call" })).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_strict_args_rejects_extra_keys() {
    let lenient = handler();
    let result = call_tool(&lenient, "greet", json!({ "name": "Bo", "mood": "happy" })).await;
    assert_eq!(first_text(&result), "Hello, Bo!");

    let strict = handler_with(ServerConfig {
        strict_args: true,
        ..Default::default()
    });
    let result = call_tool(&strict, "greet", json!({ "name": "Bo", "mood": "happy" })).await;
    assert_eq!(result["isError"], true);
    assert!(first_text(&result).contains("mood"));
}

#[tokio::test]
async fn test_generate_image_without_token() {
    let h = handler();
    let result = call_tool(&h, "generate_image", json!({ "prompt": "a red fox" })).await;
    assert_eq!(result["isError"], true);
    assert_eq!(first_text(&result), "HF_TOKEN is not configured");
}

// ═══════════════════════════════════════════════════════
// RESOURCES & PROMPTS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_read_server_info() {
    let h = handler();
    let msg = mcp_request(1, "resources/read", json!({ "uri": "server://info" }));
    let resp = send_unwrap(&h, msg).await;
    let contents = &resp["result"]["contents"][0];
    assert_eq!(contents["uri"], "server://info");
    assert_eq!(contents["mimeType"], "application/json");

    let info: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(info["name"], "toolbelt-mcp");
    assert_eq!(info["protocolVersion"], "2024-11-05");
    assert_eq!(info["tools"].as_array().unwrap().len(), 6);
    assert_eq!(info["prompts"], json!(["code_review", "weather_briefing"]));
}

#[tokio::test]
async fn test_read_greeting_template() {
    let h = handler();
    let msg = mcp_request(1, "resources/read", json!({ "uri": "greeting://Ada%20Lovelace" }));
    let resp = send_unwrap(&h, msg).await;
    let contents = &resp["result"]["contents"][0];
    assert_eq!(contents["uri"], "greeting://Ada%20Lovelace");
    assert_eq!(contents["mimeType"], "text/plain");
    assert_eq!(contents["text"], "Hello, Ada Lovelace!");
}

#[tokio::test]
async fn test_read_unknown_resource() {
    let h = handler();
    let msg = mcp_request(1, "resources/read", json!({ "uri": "nothing://here" }));
    let resp = send_unwrap(&h, msg).await;
    assert_eq!(resp["error"]["code"], -32802);
    assert_eq!(
        resp["error"]["message"],
        "unknown capability: resource/nothing://here"
    );
}

#[tokio::test]
async fn test_get_code_review_prompt() {
    let h = handler();
    let msg = mcp_request(
        1,
        "prompts/get",
        json!({ "name": "code_review", "arguments": { "code": "let x = 1;", "language": "rust" } }),
    );
    let resp = send_unwrap(&h, msg).await;
    let result = &resp["result"];
    assert_eq!(result["description"], "Review code with a chosen focus");
    assert_eq!(result["messages"][0]["role"], "user");
    let text = result["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("focus on readability"));
    assert!(text.contains("let x = 1;"));
}

#[tokio::test]
async fn test_prompt_errors_are_json_rpc_errors() {
    let h = handler();
    let msg = mcp_request(1, "prompts/get", json!({ "name": "code_review", "arguments": {} }));
    let resp = send_unwrap(&h, msg).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert!(resp["error"]["message"].as_str().unwrap().contains("code"));

    let msg = mcp_request(2, "prompts/get", json!({ "name": "haiku" }));
    let resp = send_unwrap(&h, msg).await;
    assert_eq!(resp["error"]["code"], -32804);
}

#[tokio::test]
async fn test_weather_briefing_prompt() {
    let h = handler();
    let msg = mcp_request(
        1,
        "prompts/get",
        json!({ "name": "weather_briefing", "arguments": { "city": "Seoul" } }),
    );
    let resp = send_unwrap(&h, msg).await;
    let text = resp["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("Seoul"));
    assert!(text.contains("geocode"));
    assert!(text.contains("get_weather"));
}

// ═══════════════════════════════════════════════════════
// STDIO TRANSPORT
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_stdio_round_trip_and_parse_error() {
    let mut input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
        "\n",
        "{this is not json\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"calculate\",\"arguments\":{\"number1\":2,\"number2\":3,\"operator\":\"*\"}}}\n",
    )
    .as_bytes()
    .to_vec();
    input.extend_from_slice(b"\xff\xfe garbage\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");
    let reader = tokio::io::BufReader::new(input.as_slice());
    let mut output = Vec::new();

    StdioTransport::new(handler())
        .serve(reader, &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(lines[2]["result"]["content"][0]["text"], "2 * 3 = 6");
    assert_eq!(lines[3]["error"]["code"], -32700);
    assert_eq!(lines[3]["id"], Value::Null);
    assert_eq!(lines[4]["id"], 3);
    assert!(lines[4]["result"].is_object());
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_calls_share_dispatcher() {
    let h = handler();
    let calls = (0..20).map(|i| {
        let h = h.clone();
        tokio::spawn(async move {
            let result = call_tool(
                &h,
                "calculate",
                json!({ "number1": i, "number2": 1, "operator": "+" }),
            )
            .await;
            (i, first_text(&result).to_string())
        })
    });
    for call in calls.collect::<Vec<_>>() {
        let (i, text) = call.await.unwrap();
        assert_eq!(text, format!("{i} + 1 = {}", i + 1));
    }
}
