// crm-gate-mcp/src/protocol.rs
// ============================================================================
// Module: MCP Protocol Adapter
// Description: JSON-RPC 2.0 envelope handling for CRM Gate tools.
// Purpose: Map MCP methods onto the dispatcher independent of transport.
// Dependencies: crate::{dispatcher, telemetry}, axum (status codes), serde
// ============================================================================

//! ## Overview
//! [`ProtocolAdapter`] parses JSON-RPC envelopes and answers `initialize`,
//! `ping`, `tools/list`, and `tools/call`. Methods under `notifications/`
//! produce no response. Tool calls carry the caller in
//! `arguments.agent_id`; the adapter strips it before dispatch so handlers
//! only ever see domain arguments.
//!
//! `tools/list` publishes the full catalog to any caller. Permission checks
//! happen on `tools/call`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::dispatcher::DispatchError;
use crate::dispatcher::DispatchRequest;
use crate::dispatcher::ToolDispatcher;
use crate::handlers::HandlerFailure;
use crate::registry::ToolDefinition;
use crate::schema::AGENT_ID_ARG;
use crate::telemetry::McpMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol version reported by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "crm-gate";
/// JSON-RPC protocol version.
const JSONRPC_VERSION: &str = "2.0";
/// Method prefix for client notifications.
const NOTIFICATION_PREFIX: &str = "notifications/";

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version; must be `2.0` when present.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request identifier.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier mirrored from the request.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments, including `agent_id`.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON-encoded tool output carried as text.
    Text {
        /// Serialized payload.
        text: String,
    },
}

/// Result of handling one JSON-RPC payload.
#[derive(Debug, Clone)]
pub struct ProtocolOutcome {
    /// HTTP status for transports that carry one.
    pub status: StatusCode,
    /// Response envelope; `None` for notifications.
    pub response: Option<JsonRpcResponse>,
    /// Method classification for telemetry.
    pub method: McpMethod,
    /// Tool name for `tools/call`.
    pub tool: Option<String>,
    /// Correlation identifier derived from the request id.
    pub request_id: Option<String>,
}

impl ProtocolOutcome {
    /// Returns the JSON-RPC error code, if the response is an error.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.response.as_ref().and_then(|response| response.error.as_ref()).map(|error| error.code)
    }

    /// Builds the outcome for a payload over the body size limit.
    #[must_use]
    pub fn too_large() -> Self {
        Self::rejected(StatusCode::PAYLOAD_TOO_LARGE, -32070, "request body too large")
    }

    /// Builds an outcome for a payload that never parsed into a request.
    fn rejected(status: StatusCode, code: i64, message: &str) -> Self {
        Self {
            status,
            response: Some(JsonRpcResponse::failure(Value::Null, code, message)),
            method: McpMethod::Invalid,
            tool: None,
            request_id: None,
        }
    }
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Transport-independent JSON-RPC adapter over a [`ToolDispatcher`].
#[derive(Clone)]
pub struct ProtocolAdapter {
    /// Permission-gated dispatcher.
    dispatcher: ToolDispatcher,
}

impl ProtocolAdapter {
    /// Creates an adapter over a dispatcher.
    #[must_use]
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher,
        }
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Parses and handles a raw JSON-RPC payload.
    #[must_use]
    pub fn handle_bytes(&self, bytes: &[u8], max_body_bytes: usize) -> ProtocolOutcome {
        if bytes.len() > max_body_bytes {
            return ProtocolOutcome::too_large();
        }
        match serde_json::from_slice::<JsonRpcRequest>(bytes) {
            Ok(request) => self.handle_request(request),
            Err(_) => ProtocolOutcome::rejected(
                StatusCode::BAD_REQUEST,
                -32600,
                "invalid json-rpc request",
            ),
        }
    }

    /// Handles a parsed JSON-RPC request.
    #[must_use]
    pub fn handle_request(&self, request: JsonRpcRequest) -> ProtocolOutcome {
        let method = McpMethod::classify(&request.method);
        let request_id = request_id_label(&request.id);
        let mut outcome = ProtocolOutcome {
            status: StatusCode::OK,
            response: None,
            method,
            tool: None,
            request_id: request_id.clone(),
        };
        if request.jsonrpc.as_deref().is_some_and(|version| version != JSONRPC_VERSION) {
            outcome.method = McpMethod::Invalid;
            outcome.status = StatusCode::BAD_REQUEST;
            outcome.response =
                Some(JsonRpcResponse::failure(request.id, -32600, "invalid json-rpc request"));
            return outcome;
        }
        if request.method.starts_with(NOTIFICATION_PREFIX) {
            outcome.status = StatusCode::ACCEPTED;
            return outcome;
        }
        let id = request.id;
        let (status, response) = match method {
            McpMethod::Initialize => (StatusCode::OK, JsonRpcResponse::success(id, initialize_result())),
            McpMethod::Ping => (StatusCode::OK, JsonRpcResponse::success(id, json!({}))),
            McpMethod::ToolsList => self.list_tools(id),
            McpMethod::ToolsCall => {
                let params = request.params.unwrap_or(Value::Null);
                match serde_json::from_value::<ToolCallParams>(params) {
                    Ok(call) => {
                        outcome.tool = Some(call.name.clone());
                        self.call_tool(id, call, request_id)
                    }
                    Err(_) => (
                        StatusCode::BAD_REQUEST,
                        JsonRpcResponse::failure(id, -32602, "invalid tool params"),
                    ),
                }
            }
            McpMethod::Notification | McpMethod::Invalid | McpMethod::Other => {
                (StatusCode::BAD_REQUEST, JsonRpcResponse::failure(id, -32601, "method not found"))
            }
        };
        outcome.status = status;
        outcome.response = Some(response);
        outcome
    }

    /// Answers `tools/list`.
    fn list_tools(&self, id: Value) -> (StatusCode, JsonRpcResponse) {
        let result = ToolListResult {
            tools: self.dispatcher.registry().definitions(),
        };
        match serde_json::to_value(result) {
            Ok(value) => (StatusCode::OK, JsonRpcResponse::success(id, value)),
            Err(_) => serialization_failure(id),
        }
    }

    /// Answers `tools/call`.
    fn call_tool(
        &self,
        id: Value,
        call: ToolCallParams,
        request_id: Option<String>,
    ) -> (StatusCode, JsonRpcResponse) {
        let ToolCallParams {
            name,
            mut arguments,
        } = call;
        let agent_id = arguments
            .as_object_mut()
            .and_then(|map| map.remove(AGENT_ID_ARG))
            .and_then(|value| value.as_str().map(str::to_string));
        let request = DispatchRequest {
            tool: name,
            arguments,
            agent_id,
            request_id,
        };
        match call_with_blocking(&self.dispatcher, request) {
            Ok(payload) => {
                let Ok(text) = serde_json::to_string(&payload) else {
                    return serialization_failure(id);
                };
                let result = ToolCallResult {
                    content: vec![ToolContent::Text {
                        text,
                    }],
                };
                match serde_json::to_value(result) {
                    Ok(value) => (StatusCode::OK, JsonRpcResponse::success(id, value)),
                    Err(_) => serialization_failure(id),
                }
            }
            Err(err) => jsonrpc_error(id, err),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Executes a dispatch, shifting to a blocking context when available.
fn call_with_blocking(
    dispatcher: &ToolDispatcher,
    request: DispatchRequest,
) -> Result<Value, DispatchError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| dispatcher.dispatch(request))
        }
        _ => dispatcher.dispatch(request),
    }
}

/// Builds the `initialize` result.
fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// Renders a request id as a correlation label.
fn request_id_label(id: &Value) -> Option<String> {
    match id {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Builds the serialization failure response.
fn serialization_failure(id: Value) -> (StatusCode, JsonRpcResponse) {
    (StatusCode::OK, JsonRpcResponse::failure(id, -32060, "serialization failed"))
}

/// Builds a JSON-RPC error response for a dispatch failure.
fn jsonrpc_error(id: Value, error: DispatchError) -> (StatusCode, JsonRpcResponse) {
    let message = error.to_string();
    let (status, code, message) = match error {
        DispatchError::UnknownTool(_) => (StatusCode::BAD_REQUEST, -32601, message),
        DispatchError::InvalidAgent(_) => (StatusCode::UNAUTHORIZED, -32001, message),
        DispatchError::PermissionDenied {
            ..
        } => (StatusCode::FORBIDDEN, -32003, message),
        DispatchError::HandlerError(HandlerFailure::InvalidArguments(_)) => {
            (StatusCode::BAD_REQUEST, -32602, message)
        }
        DispatchError::HandlerError(HandlerFailure::NotFound(_)) => (StatusCode::OK, -32004, message),
        DispatchError::HandlerError(HandlerFailure::Store(_)) => {
            (StatusCode::OK, -32050, "record store operation failed".to_string())
        }
    };
    (status, JsonRpcResponse::failure(id, code, message))
}
