// crm-gate-mcp/tests/registry.rs
// ============================================================================
// Module: Registry Tests
// Description: Startup validation of the enum-keyed tool registry.
// ============================================================================

//! ## Overview
//! Registration rules: duplicates, bad schemas, and gaps fail at startup.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use common::CountingHandler;
use crm_gate_core::InMemoryCrmStore;
use crm_gate_core::RecordStore;
use crm_gate_core::ToolName;
use crm_gate_mcp::RegistryError;
use crm_gate_mcp::ToolHandler;
use crm_gate_mcp::ToolRegistry;
use crm_gate_mcp::build_registry;
use serde_json::json;

/// Returns a fresh counting handler.
fn handler() -> Arc<dyn ToolHandler> {
    Arc::new(CountingHandler::default())
}

#[test]
fn built_registry_covers_every_tool() {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryCrmStore::new());
    let registry = build_registry(&store).expect("registry");
    assert_eq!(registry.len(), ToolName::all().len());
    assert!(registry.ensure_complete().is_ok());
    for tool in ToolName::all() {
        assert_eq!(registry.resolve(tool.as_str()).map(|entry| entry.tool()), Some(*tool));
    }
    assert!(registry.resolve("GET_TASKS").is_none());
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = ToolRegistry::new();
    registry.register(ToolName::GetTasks, "list", json!({ "type": "object" }), handler()).unwrap();
    let err = registry
        .register(ToolName::GetTasks, "list again", json!({ "type": "object" }), handler())
        .unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate(ToolName::GetTasks)));
}

#[test]
fn invalid_schema_is_rejected_at_registration() {
    let mut registry = ToolRegistry::new();
    let err = registry
        .register(ToolName::GetLeads, "list", json!({ "type": "not-a-type" }), handler())
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidSchema { tool: ToolName::GetLeads, .. }));
}

#[test]
fn incomplete_registry_names_missing_tools() {
    let mut registry = ToolRegistry::new();
    registry.register(ToolName::GetTasks, "list", json!({ "type": "object" }), handler()).unwrap();
    let err = registry.ensure_complete().unwrap_err();
    let RegistryError::Missing(missing) = err else {
        panic!("expected missing tools");
    };
    assert!(missing.contains("create_task"));
    assert!(!missing.contains("get_tasks,"));
}

#[test]
fn definitions_follow_canonical_order() {
    let mut registry = ToolRegistry::new();
    registry.register(ToolName::DeleteInvoice, "d", json!({ "type": "object" }), handler()).unwrap();
    registry.register(ToolName::GetTasks, "g", json!({ "type": "object" }), handler()).unwrap();
    let names: Vec<ToolName> = registry.definitions().iter().map(|def| def.name).collect();
    assert_eq!(names, vec![ToolName::GetTasks, ToolName::DeleteInvoice]);
    let schema = &registry.definitions()[0].input_schema;
    assert_eq!(schema["required"], json!(["agent_id"]));
}
