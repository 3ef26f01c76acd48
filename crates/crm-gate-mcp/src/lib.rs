// crm-gate-mcp/src/lib.rs
// ============================================================================
// Module: CRM Gate MCP Library
// Description: Permission-gated MCP tool dispatch for CRM Gate.
// Purpose: Expose the registry, dispatcher, protocol adapter, and server.
// Dependencies: crm-gate-core, crm-gate-config, crm-gate-store-sqlite
// ============================================================================

//! ## Overview
//! This crate turns MCP `tools/call` requests into CRM record operations.
//! Every call passes through [`ToolDispatcher`], which resolves the tool,
//! validates the calling agent, checks the agent's permission map, runs the
//! handler, and writes exactly one audit record per attempt. The
//! [`ProtocolAdapter`] maps JSON-RPC envelopes onto the dispatcher and
//! [`McpServer`] hosts it over stdio or HTTP.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditLogger;
pub use audit::DiagnosticEvent;
pub use audit::FileDispatchAuditSink;
pub use audit::McpEventSink;
pub use audit::McpFileEventSink;
pub use audit::McpNoopEventSink;
pub use audit::McpStderrEventSink;
pub use audit::NoopDispatchAuditSink;
pub use audit::StderrDispatchAuditSink;
pub use dispatcher::DispatchError;
pub use dispatcher::DispatchRequest;
pub use dispatcher::ToolDispatcher;
pub use handlers::AgentContext;
pub use handlers::HandlerFailure;
pub use handlers::HandlerOutput;
pub use handlers::ToolHandler;
pub use protocol::JsonRpcError;
pub use protocol::JsonRpcRequest;
pub use protocol::JsonRpcResponse;
pub use protocol::ProtocolOutcome;
pub use protocol::ProtocolAdapter;
pub use registry::RegisteredTool;
pub use registry::RegistryError;
pub use registry::ToolDefinition;
pub use registry::ToolRegistry;
pub use server::McpServer;
pub use server::McpServerError;
pub use tools::build_registry;
