// crm-gate-mcp/tests/http_transport.rs
// ============================================================================
// Module: HTTP Transport Tests
// Description: POST /rpc behavior for the config-built server.
// ============================================================================

//! ## Overview
//! Builds [`McpServer`] from TOML and drives its axum router in-process.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use crm_gate_config::CrmGateConfig;
use crm_gate_mcp::McpServer;
use http_body_util::BodyExt;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

/// Builds an HTTP server config with a JSON-lines audit file.
fn server(audit_path: &std::path::Path, max_body_bytes: usize) -> McpServer {
    let toml = format!(
        r#"
[server]
transport = "http"
bind = "127.0.0.1:0"
max_body_bytes = {max_body_bytes}

[audit]
sink = "file"
path = "{}"

[events]
sink = "none"

[[agents]]
agent_id = "front-desk"
name = "Front Desk"

[agents.permissions.leads]
enabled = true
tools = ["get_leads", "create_lead"]
"#,
        audit_path.display()
    );
    let config = CrmGateConfig::from_toml_str(&toml).expect("config");
    McpServer::from_config(config).expect("server")
}

/// Posts a raw body to `/rpc`.
async fn post(server: &McpServer, body: String) -> (StatusCode, Vec<u8>) {
    let request = Request::post("/rpc")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request");
    let response = server.http_router().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn tool_call_round_trip_writes_audit_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let audit_path = dir.path().join("audit.jsonl");
    let server = server(&audit_path, 64 * 1024);

    let call = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {
            "name": "create_lead",
            "arguments": { "agent_id": "front-desk", "name": "Ada", "phone": "555-0101" }
        }
    });
    let (status, bytes) = post(&server, call.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["content"][0]["type"], "text");

    let audit = std::fs::read_to_string(&audit_path).expect("audit");
    let lines: Vec<Value> =
        audit.lines().map(|line| serde_json::from_str(line).expect("line")).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["tool"], "create_lead");
    assert_eq!(lines[0]["outcome"], "success");
}

#[tokio::test]
async fn denied_call_returns_forbidden() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir.path().join("audit.jsonl"), 64 * 1024);

    let call = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "delete_lead", "arguments": { "agent_id": "front-desk", "id": "x" } }
    });
    let (status, bytes) = post(&server, call.to_string()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["error"]["code"], -32003);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir.path().join("audit.jsonl"), 64 * 1024);

    let (status, bytes) = post(
        &server,
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = server(&dir.path().join("audit.jsonl"), 32);

    let (status, bytes) = post(
        &server,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {} }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["error"]["code"], -32070);
}
