// crm-gate-mcp/tests/common/mod.rs
// =============================================================================
// Module: MCP Test Helpers
// Description: Shared fixtures for dispatcher and protocol tests.
// Purpose: Build dispatchers over in-memory stores with observable collaborators.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crm_gate_core::Agent;
use crm_gate_core::AgentAdmin;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::DispatchRecord;
use crm_gate_core::InMemoryCrmStore;
use crm_gate_core::PermissionMap;
use crm_gate_core::PermissionStore;
use crm_gate_core::RecordStore;
use crm_gate_core::StoreError;
use crm_gate_core::ToolName;
use crm_gate_mcp::AgentContext;
use crm_gate_mcp::AuditLogger;
use crm_gate_mcp::DiagnosticEvent;
use crm_gate_mcp::DispatchRequest;
use crm_gate_mcp::HandlerFailure;
use crm_gate_mcp::HandlerOutput;
use crm_gate_mcp::McpEventSink;
use crm_gate_mcp::ProtocolAdapter;
use crm_gate_mcp::ToolDispatcher;
use crm_gate_mcp::ToolHandler;
use crm_gate_mcp::ToolRegistry;
use crm_gate_mcp::audit::McpRequestEvent;
use crm_gate_mcp::build_registry;
use crm_gate_mcp::tools::schema_for;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Observable Collaborators
// ============================================================================

/// Event sink that keeps every event in memory.
#[derive(Default)]
pub struct CapturingEvents {
    /// Request events.
    pub requests: Mutex<Vec<McpRequestEvent>>,
    /// Diagnostic events.
    pub diagnostics: Mutex<Vec<DiagnosticEvent>>,
}

impl CapturingEvents {
    /// Returns the diagnostic kinds seen so far.
    pub fn diagnostic_kinds(&self) -> Vec<&'static str> {
        self.diagnostics.lock().unwrap().iter().map(|event| event.kind).collect()
    }
}

impl McpEventSink for CapturingEvents {
    fn record(&self, event: &McpRequestEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_diagnostic(&self, event: &DiagnosticEvent) {
        self.diagnostics.lock().unwrap().push(event.clone());
    }
}

/// Permission store that counts lookups and can be forced to fail.
pub struct CountingPermissions {
    /// Backing store.
    inner: Arc<InMemoryCrmStore>,
    /// Number of lookups.
    calls: AtomicUsize,
    /// When true, every lookup fails.
    fail: bool,
}

impl CountingPermissions {
    /// Wraps a store.
    pub fn new(inner: Arc<InMemoryCrmStore>, fail: bool) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    /// Returns the number of lookups.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PermissionStore for CountingPermissions {
    fn permissions(&self, agent_id: &AgentId) -> Result<Option<PermissionMap>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Io("permission backend unavailable".to_string()));
        }
        self.inner.permissions(agent_id)
    }
}

/// Audit sink whose every append fails.
pub struct FailingAuditSink;

impl DispatchAuditSink for FailingAuditSink {
    fn append(&self, _record: &DispatchRecord) -> Result<(), StoreError> {
        Err(StoreError::Io("audit volume is read-only".to_string()))
    }
}

/// Handler that counts invocations and echoes its arguments.
#[derive(Default)]
pub struct CountingHandler {
    /// Number of invocations.
    calls: AtomicUsize,
}

impl CountingHandler {
    /// Returns the number of invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolHandler for CountingHandler {
    fn call(
        &self,
        arguments: Value,
        _context: &AgentContext,
    ) -> Result<HandlerOutput, HandlerFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HandlerOutput {
            payload: arguments,
            summary: json!({ "echo": true }),
        })
    }
}

/// Handler that always reports a store failure.
pub struct FailingStoreHandler;

impl ToolHandler for FailingStoreHandler {
    fn call(
        &self,
        _arguments: Value,
        _context: &AgentContext,
    ) -> Result<HandlerOutput, HandlerFailure> {
        Err(HandlerFailure::Store("sqlite: database is locked at /var/lib/crm.db".to_string()))
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Dispatcher wired to an in-memory store with observable collaborators.
pub struct Harness {
    /// Backing store (records, agents, audit trail).
    pub store: Arc<InMemoryCrmStore>,
    /// Counting permission store.
    pub permissions: Arc<CountingPermissions>,
    /// Captured operational events.
    pub events: Arc<CapturingEvents>,
    /// Dispatcher under test.
    pub dispatcher: ToolDispatcher,
}

impl Harness {
    /// Builds a harness over the real tool registry.
    pub fn new() -> Self {
        let store = Arc::new(InMemoryCrmStore::new());
        let records: Arc<dyn RecordStore> = store.clone();
        let registry = build_registry(&records).expect("registry");
        Self::with_registry(store, registry, false)
    }

    /// Builds a harness whose permission lookups always fail.
    pub fn with_failing_permissions() -> Self {
        let store = Arc::new(InMemoryCrmStore::new());
        let records: Arc<dyn RecordStore> = store.clone();
        let registry = build_registry(&records).expect("registry");
        Self::with_registry(store, registry, true)
    }

    /// Builds a harness whose audit sink rejects every record.
    pub fn with_failing_audit() -> Self {
        let store = Arc::new(InMemoryCrmStore::new());
        let records: Arc<dyn RecordStore> = store.clone();
        let registry = build_registry(&records).expect("registry");
        Self::assemble(store, registry, false, Arc::new(FailingAuditSink))
    }

    /// Builds a harness over a custom registry.
    pub fn with_registry(
        store: Arc<InMemoryCrmStore>,
        registry: ToolRegistry,
        fail_permissions: bool,
    ) -> Self {
        let sink: Arc<dyn DispatchAuditSink> = store.clone();
        Self::assemble(store, registry, fail_permissions, sink)
    }

    /// Wires the dispatcher around an explicit audit sink.
    fn assemble(
        store: Arc<InMemoryCrmStore>,
        registry: ToolRegistry,
        fail_permissions: bool,
        sink: Arc<dyn DispatchAuditSink>,
    ) -> Self {
        let permissions = Arc::new(CountingPermissions::new(store.clone(), fail_permissions));
        let events = Arc::new(CapturingEvents::default());
        let dispatcher = ToolDispatcher::new(
            Arc::new(registry),
            store.clone(),
            permissions.clone(),
            AuditLogger::new(sink, events.clone()),
            events.clone(),
        );
        Self {
            store,
            permissions,
            events,
            dispatcher,
        }
    }

    /// Returns a protocol adapter over the harness dispatcher.
    pub fn adapter(&self) -> ProtocolAdapter {
        ProtocolAdapter::new(self.dispatcher.clone())
    }

    /// Registers an active agent with a permission map.
    pub fn agent(&self, agent_id: &str, permissions: &Value) {
        self.agent_with_status(agent_id, AgentStatus::Active, permissions);
    }

    /// Registers an agent with an explicit status.
    pub fn agent_with_status(&self, agent_id: &str, status: AgentStatus, permissions: &Value) {
        let agent = Agent {
            agent_id: AgentId::new(agent_id),
            name: format!("{agent_id} agent"),
            status,
        };
        self.store.upsert_agent(&agent).expect("agent");
        let map = PermissionMap::from_json(permissions).expect("permissions");
        self.store.set_permissions(&agent.agent_id, &map).expect("permissions");
    }

    /// Returns the audit trail.
    pub fn audit(&self) -> Vec<DispatchRecord> {
        self.store.dispatch_records().expect("audit")
    }
}

/// Builds a registry where every tool uses `handler`.
pub fn registry_with_handler(handler: &Arc<dyn ToolHandler>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in ToolName::all() {
        let schema = schema_for(tool.domain());
        registry
            .register(
                *tool,
                schema.description(tool.operation()),
                schema.arguments_schema(tool.operation()),
                Arc::clone(handler),
            )
            .expect("register");
    }
    registry
}

/// Builds a dispatch request.
pub fn request(tool: &str, agent_id: Option<&str>, arguments: Value) -> DispatchRequest {
    DispatchRequest {
        tool: tool.to_string(),
        arguments,
        agent_id: agent_id.map(str::to_string),
        request_id: Some("req-1".to_string()),
    }
}
