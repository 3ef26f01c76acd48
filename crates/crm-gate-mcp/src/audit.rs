// crm-gate-mcp/src/audit.rs
// ============================================================================
// Module: MCP Audit Logging
// Description: Dispatch audit logger, JSON-lines sinks, and operational events.
// Purpose: Record every dispatch attempt without letting logging fail a call.
// Dependencies: crm-gate-core, crm-gate-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Two streams leave the server:
//! - Dispatch records: one per tool call past name resolution, written
//!   through a [`DispatchAuditSink`] (record store, stderr, file, or no-op).
//! - Operational events: per-request [`McpRequestEvent`] lines and
//!   [`DiagnosticEvent`] lines written through an [`McpEventSink`].
//!
//! [`AuditLogger::record`] returns `()`. When the audit sink fails, the
//! failure is reported as a diagnostic event and the tool result stands.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crm_gate_config::ServerTransport;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::DispatchRecord;
use crm_gate_core::StoreError;
use serde::Serialize;

use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Per-request MCP event payload.
#[derive(Debug, Clone, Serialize)]
pub struct McpRequestEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport used for the request.
    pub transport: ServerTransport,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name when available (tools/call).
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Inputs required to construct a request event.
pub struct McpRequestEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport type used for the request.
    pub transport: ServerTransport,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name when available (tools/call).
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl McpRequestEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(params: McpRequestEventParams) -> Self {
        Self {
            event: "mcp_request",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            transport: params.transport,
            method: params.method,
            tool: params.tool,
            outcome: params.outcome,
            error_code: params.error_code,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

/// Operational diagnostic payload.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Diagnostic kind label.
    pub kind: &'static str,
    /// Diagnostic message.
    pub message: String,
    /// Tool name when the diagnostic concerns a call.
    pub tool: Option<String>,
    /// Agent identifier when known.
    pub agent_id: Option<String>,
    /// Request identifier when provided.
    pub request_id: Option<String>,
}

impl DiagnosticEvent {
    /// Creates a diagnostic with no call metadata.
    #[must_use]
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            event: "diagnostic",
            timestamp_ms: now_ms(),
            kind,
            message: message.into(),
            tool: None,
            agent_id: None,
            request_id: None,
        }
    }

    /// Attaches call metadata.
    #[must_use]
    pub fn with_call(
        mut self,
        tool: impl Into<String>,
        agent_id: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        self.tool = Some(tool.into());
        self.agent_id = agent_id;
        self.request_id = request_id;
        self
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Event Sinks
// ============================================================================

/// Sink for operational MCP events.
pub trait McpEventSink: Send + Sync {
    /// Record a request event.
    fn record(&self, event: &McpRequestEvent);

    /// Record a diagnostic event.
    fn record_diagnostic(&self, _event: &DiagnosticEvent) {}
}

/// Event sink that logs JSON lines to stderr.
pub struct McpStderrEventSink;

impl McpEventSink for McpStderrEventSink {
    fn record(&self, event: &McpRequestEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_diagnostic(&self, event: &DiagnosticEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that logs JSON lines to a file.
pub struct McpFileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl McpFileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: Mutex::new(open_append(path)?),
        })
    }
}

impl McpEventSink for McpFileEventSink {
    fn record(&self, event: &McpRequestEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }

    fn record_diagnostic(&self, event: &DiagnosticEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct McpNoopEventSink;

impl McpEventSink for McpNoopEventSink {
    fn record(&self, _event: &McpRequestEvent) {}

    fn record_diagnostic(&self, _event: &DiagnosticEvent) {}
}

// ============================================================================
// SECTION: Dispatch Audit Sinks
// ============================================================================

/// Dispatch audit sink that logs JSON lines to stderr.
pub struct StderrDispatchAuditSink;

impl DispatchAuditSink for StderrDispatchAuditSink {
    fn append(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        let payload = encode_record(record)?;
        writeln!(std::io::stderr(), "{payload}").map_err(|err| StoreError::Io(err.to_string()))
    }
}

/// Dispatch audit sink that appends JSON lines to a file.
pub struct FileDispatchAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileDispatchAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: Mutex::new(open_append(path)?),
        })
    }
}

impl DispatchAuditSink for FileDispatchAuditSink {
    fn append(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        let payload = encode_record(record)?;
        let mut file =
            self.file.lock().map_err(|_| StoreError::Io("audit log lock poisoned".to_string()))?;
        writeln!(file, "{payload}").map_err(|err| StoreError::Io(err.to_string()))?;
        file.flush().map_err(|err| StoreError::Io(err.to_string()))
    }
}

/// No-op dispatch audit sink.
pub struct NoopDispatchAuditSink;

impl DispatchAuditSink for NoopDispatchAuditSink {
    fn append(&self, _record: &DispatchRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Serializes a dispatch record as one JSON line.
fn encode_record(record: &DispatchRecord) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|err| StoreError::Invalid(err.to_string()))
}

/// Opens `path` for appending, creating it when absent.
fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

// ============================================================================
// SECTION: Audit Logger
// ============================================================================

/// Writes dispatch records and absorbs sink failures.
#[derive(Clone)]
pub struct AuditLogger {
    /// Destination for dispatch records.
    sink: Arc<dyn DispatchAuditSink>,
    /// Destination for sink-failure diagnostics.
    events: Arc<dyn McpEventSink>,
}

impl AuditLogger {
    /// Creates a logger over the given sinks.
    #[must_use]
    pub fn new(sink: Arc<dyn DispatchAuditSink>, events: Arc<dyn McpEventSink>) -> Self {
        Self {
            sink,
            events,
        }
    }

    /// Appends a dispatch record. Failures become diagnostic events.
    pub fn record(&self, record: &DispatchRecord) {
        if let Err(err) = self.sink.append(record) {
            let diagnostic = DiagnosticEvent::new("audit_sink_failed", err.to_string()).with_call(
                record.tool.clone(),
                Some(record.agent_id.as_str().to_string()),
                record.request_id.clone(),
            );
            self.events.record_diagnostic(&diagnostic);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
