// crm-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose CRM Gate tools via JSON-RPC 2.0.
// Dependencies: crm-gate-config, crm-gate-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server wires configuration into a running dispatcher: it opens the
//! record store, seeds configured agents, selects audit and event sinks, and
//! builds the tool registry. Requests arrive over stdio (Content-Length
//! framing) or HTTP (`POST /rpc`) and always route through
//! [`ProtocolAdapter`]. Every request produces one [`McpRequestEvent`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use crm_gate_config::AuditSinkKind;
use crm_gate_config::CrmGateConfig;
use crm_gate_config::EventSinkKind;
use crm_gate_config::ServerTransport;
use crm_gate_config::StoreType;
use crm_gate_core::AgentAdmin;
use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::InMemoryCrmStore;
use crm_gate_core::PermissionStore;
use crm_gate_core::RecordStore;
use crm_gate_store_sqlite::SqliteCrmStore;

use crate::audit::AuditLogger;
use crate::audit::FileDispatchAuditSink;
use crate::audit::McpEventSink;
use crate::audit::McpFileEventSink;
use crate::audit::McpNoopEventSink;
use crate::audit::McpRequestEvent;
use crate::audit::McpRequestEventParams;
use crate::audit::McpStderrEventSink;
use crate::audit::NoopDispatchAuditSink;
use crate::audit::StderrDispatchAuditSink;
use crate::dispatcher::ToolDispatcher;
use crate::protocol::ProtocolAdapter;
use crate::protocol::ProtocolOutcome;
use crate::telemetry::McpOutcome;
use crate::tools::build_registry;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: CrmGateConfig,
    /// Protocol adapter for request dispatch.
    adapter: ProtocolAdapter,
    /// Operational event sink.
    events: Arc<dyn McpEventSink>,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation or initialization fails.
    pub fn from_config(mut config: CrmGateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let backend = Backend::from_config(&config)?;
        seed_agents(&config, backend.admin.as_ref())?;
        let events = build_event_sink(&config)?;
        let audit_sink = build_audit_sink(&config, &backend)?;
        let registry =
            build_registry(&backend.records).map_err(|err| McpServerError::Init(err.to_string()))?;
        let dispatcher = ToolDispatcher::new(
            Arc::new(registry),
            backend.agents,
            backend.permissions,
            AuditLogger::new(audit_sink, Arc::clone(&events)),
            Arc::clone(&events),
        );
        Ok(Self {
            config,
            adapter: ProtocolAdapter::new(dispatcher),
            events,
        })
    }

    /// Returns the protocol adapter.
    #[must_use]
    pub const fn adapter(&self) -> &ProtocolAdapter {
        &self.adapter
    }

    /// Builds the HTTP router serving `POST /rpc`.
    #[must_use]
    pub fn http_router(&self) -> Router {
        let state = Arc::new(ServerState {
            adapter: self.adapter.clone(),
            events: Arc::clone(&self.events),
            max_body_bytes: self.config.server.max_body_bytes,
        });
        Router::new().route("/rpc", post(handle_http)).with_state(state)
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => {
                let mut reader = BufReader::new(std::io::stdin());
                let mut writer = std::io::stdout();
                serve_stdio(
                    &self.adapter,
                    self.events.as_ref(),
                    self.config.server.max_body_bytes,
                    &mut reader,
                    &mut writer,
                )
            }
            ServerTransport::Http => self.serve_http().await,
        }
    }

    /// Serves JSON-RPC requests over HTTP.
    async fn serve_http(self) -> Result<(), McpServerError> {
        let addr = self
            .config
            .server
            .bind_addr()
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let app = self.http_router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| McpServerError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Backend Wiring
// ============================================================================

/// Trait objects over the configured store.
struct Backend {
    /// Record persistence.
    records: Arc<dyn RecordStore>,
    /// Agent lookup.
    agents: Arc<dyn AgentDirectory>,
    /// Permission lookup.
    permissions: Arc<dyn PermissionStore>,
    /// Agent administration for seeding.
    admin: Arc<dyn AgentAdmin>,
    /// Store-backed dispatch audit sink.
    audit: Arc<dyn DispatchAuditSink>,
}

impl Backend {
    /// Opens the configured store.
    fn from_config(config: &CrmGateConfig) -> Result<Self, McpServerError> {
        match config.store.store_type {
            StoreType::Memory => Ok(Self::from_store(InMemoryCrmStore::new())),
            StoreType::Sqlite => {
                let sqlite_config = config.store.sqlite_config().ok_or_else(|| {
                    McpServerError::Config("sqlite store requires path".to_string())
                })?;
                let store = SqliteCrmStore::new(&sqlite_config)
                    .map_err(|err| McpServerError::Init(err.to_string()))?;
                Ok(Self::from_store(store))
            }
        }
    }

    /// Shares one store across every collaborator role.
    fn from_store<S>(store: S) -> Self
    where
        S: RecordStore + AgentDirectory + PermissionStore + AgentAdmin + DispatchAuditSink + 'static,
    {
        let store = Arc::new(store);
        Self {
            records: store.clone(),
            agents: store.clone(),
            permissions: store.clone(),
            admin: store.clone(),
            audit: store,
        }
    }
}

/// Writes configured agents and their permission maps to the store.
fn seed_agents(config: &CrmGateConfig, admin: &dyn AgentAdmin) -> Result<(), McpServerError> {
    for seed in &config.agents {
        admin
            .upsert_agent(&seed.to_agent())
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        admin
            .set_permissions(&AgentId::new(seed.agent_id.clone()), &seed.permissions)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
    }
    Ok(())
}

/// Selects the operational event sink.
fn build_event_sink(config: &CrmGateConfig) -> Result<Arc<dyn McpEventSink>, McpServerError> {
    let sink: Arc<dyn McpEventSink> = match config.events.sink {
        EventSinkKind::Stderr => Arc::new(McpStderrEventSink),
        EventSinkKind::None => Arc::new(McpNoopEventSink),
        EventSinkKind::File => {
            let path = required_path(config.events.path.as_deref(), "events.path")?;
            Arc::new(
                McpFileEventSink::new(path).map_err(|err| McpServerError::Init(err.to_string()))?,
            )
        }
    };
    Ok(sink)
}

/// Selects the dispatch audit sink.
fn build_audit_sink(
    config: &CrmGateConfig,
    backend: &Backend,
) -> Result<Arc<dyn DispatchAuditSink>, McpServerError> {
    let sink: Arc<dyn DispatchAuditSink> = match config.audit.sink {
        AuditSinkKind::Store => Arc::clone(&backend.audit),
        AuditSinkKind::Stderr => Arc::new(StderrDispatchAuditSink),
        AuditSinkKind::None => Arc::new(NoopDispatchAuditSink),
        AuditSinkKind::File => {
            let path = required_path(config.audit.path.as_deref(), "audit.path")?;
            Arc::new(
                FileDispatchAuditSink::new(path)
                    .map_err(|err| McpServerError::Init(err.to_string()))?,
            )
        }
    };
    Ok(sink)
}

/// Returns a configured file path or a config error naming the key.
fn required_path<'a>(path: Option<&'a str>, key: &str) -> Result<&'a Path, McpServerError> {
    path.map(Path::new).ok_or_else(|| McpServerError::Config(format!("{key} is required")))
}

// ============================================================================
// SECTION: Request Events
// ============================================================================

/// Emits the per-request event for a handled payload.
fn record_request(
    events: &dyn McpEventSink,
    transport: ServerTransport,
    outcome: &ProtocolOutcome,
    request_bytes: usize,
    response_bytes: usize,
) {
    let error_code = outcome.error_code();
    events.record(&McpRequestEvent::new(McpRequestEventParams {
        request_id: outcome.request_id.clone(),
        transport,
        method: outcome.method,
        tool: outcome.tool.clone(),
        outcome: if error_code.is_some() { McpOutcome::Error } else { McpOutcome::Ok },
        error_code,
        request_bytes,
        response_bytes,
    }));
}

/// Fallback body when a response envelope cannot be serialized.
const SERIALIZATION_FAILED_BODY: &str =
    "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32060,\"message\":\"serialization \
     failed\"}}";

/// Serializes a protocol outcome's response, if any.
fn encode_response(outcome: &ProtocolOutcome) -> Option<Vec<u8>> {
    outcome.response.as_ref().map(|response| {
        serde_json::to_vec(response).unwrap_or_else(|_| SERIALIZATION_FAILED_BODY.as_bytes().to_vec())
    })
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves framed JSON-RPC requests until the input closes.
fn serve_stdio(
    adapter: &ProtocolAdapter,
    events: &dyn McpEventSink,
    max_body_bytes: usize,
    reader: &mut BufReader<impl Read>,
    writer: &mut impl Write,
) -> Result<(), McpServerError> {
    while let Some(frame) = read_framed(reader, max_body_bytes)? {
        let (outcome, request_bytes) = match frame {
            Frame::Body(bytes) => (adapter.handle_bytes(&bytes, max_body_bytes), bytes.len()),
            Frame::Oversized(len) => (ProtocolOutcome::too_large(), len),
        };
        let payload = encode_response(&outcome);
        if let Some(payload) = &payload {
            write_framed(writer, payload)?;
        }
        record_request(
            events,
            ServerTransport::Stdio,
            &outcome,
            request_bytes,
            payload.as_ref().map_or(0, Vec::len),
        );
    }
    Ok(())
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
struct ServerState {
    /// Protocol adapter for request dispatch.
    adapter: ProtocolAdapter,
    /// Operational event sink.
    events: Arc<dyn McpEventSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(State(state): State<Arc<ServerState>>, bytes: Bytes) -> Response {
    let outcome = state.adapter.handle_bytes(&bytes, state.max_body_bytes);
    let payload = encode_response(&outcome);
    record_request(
        state.events.as_ref(),
        ServerTransport::Http,
        &outcome,
        bytes.len(),
        payload.as_ref().map_or(0, Vec::len),
    );
    match payload {
        Some(body) => (
            outcome.status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// One framed stdio payload.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// Payload within the size limit.
    Body(Vec<u8>),
    /// Payload over the size limit; the body was drained.
    Oversized(usize),
}

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `None` when the input closes before a new frame starts.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Frame>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if saw_header {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        let expected = u64::try_from(len)
            .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
        let drained = std::io::copy(&mut reader.by_ref().take(expected), &mut std::io::sink())
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if drained < expected {
            return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
        }
        return Ok(Some(Frame::Oversized(len)));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(Frame::Body(buf)))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
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
        reason = "Test-only framing assertions."
    )]

    use std::io::BufReader;
    use std::io::Cursor;

    use crm_gate_config::CrmGateConfig;
    use serde_json::Value;

    use super::Frame;
    use super::McpServer;
    use super::read_framed;
    use super::serve_stdio;
    use crate::audit::McpNoopEventSink;

    fn frame(payload: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{payload}", payload.len())
    }

    fn memory_server() -> McpServer {
        let config = CrmGateConfig::from_toml_str(
            r#"
[events]
sink = "none"

[[agents]]
agent_id = "front-desk"
name = "Front Desk"

[agents.permissions.tasks]
enabled = true
tools = ["get_tasks", "create_task"]
"#,
        )
        .expect("config");
        McpServer::from_config(config).expect("server")
    }

    /// Splits a framed output stream into JSON payloads.
    fn decode_frames(output: &[u8]) -> Vec<Value> {
        let mut reader = BufReader::new(Cursor::new(output.to_vec()));
        let mut payloads = Vec::new();
        while let Some(frame) = read_framed(&mut reader, usize::MAX).expect("frame") {
            match frame {
                Frame::Body(bytes) => payloads.push(serde_json::from_slice(&bytes).expect("json")),
                Frame::Oversized(_) => panic!("unexpected oversized frame"),
            }
        }
        payloads
    }

    #[test]
    fn read_framed_drains_payload_over_limit() {
        let payload = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let input = format!("{}{}", frame(payload), frame(payload));
        let mut reader = BufReader::new(Cursor::new(input.into_bytes()));
        let first = read_framed(&mut reader, payload.len() - 1).expect("frame");
        assert_eq!(first, Some(Frame::Oversized(payload.len())));
        let second = read_framed(&mut reader, payload.len()).expect("frame");
        assert_eq!(second, Some(Frame::Body(payload.as_bytes().to_vec())));
    }

    #[test]
    fn read_framed_reports_clean_eof() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        assert_eq!(read_framed(&mut reader, 16).expect("eof"), None);
    }

    #[test]
    fn read_framed_rejects_missing_length() {
        let mut reader = BufReader::new(Cursor::new(b"X-Other: 1\r\n\r\n{}".to_vec()));
        assert!(read_framed(&mut reader, 16).is_err());
    }

    #[test]
    fn stdio_answers_requests_and_skips_notifications() {
        let server = memory_server();
        let input = [
            frame(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#),
            frame(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#),
            frame(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"create_task","arguments":{"agent_id":"front-desk","title":"Call back"}}}"#,
            ),
            frame("not json"),
        ]
        .concat();
        let mut reader = BufReader::new(Cursor::new(input.into_bytes()));
        let mut output = Vec::new();
        serve_stdio(server.adapter(), &McpNoopEventSink, 1024 * 1024, &mut reader, &mut output)
            .expect("serve");
        let responses = decode_frames(&output);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[1]["id"], 2);
        assert!(responses[1]["result"]["content"][0]["text"].is_string());
        assert_eq!(responses[2]["error"]["code"], -32600);
    }

    #[test]
    fn stdio_rejects_oversized_frame_and_continues() {
        let server = memory_server();
        let big = format!(r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{}"}}}}"#, "x".repeat(64));
        let input = [frame(&big), frame(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)].concat();
        let mut reader = BufReader::new(Cursor::new(input.into_bytes()));
        let mut output = Vec::new();
        serve_stdio(server.adapter(), &McpNoopEventSink, 64, &mut reader, &mut output)
            .expect("serve");
        let responses = decode_frames(&output);
        assert_eq!(responses[0]["error"]["code"], -32070);
        assert_eq!(responses[1]["result"], serde_json::json!({}));
    }
}
