//! Config validation tests for crm-gate-config.
// crm-gate-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate server, store, sink, and seed agent constraints.
// Purpose: Ensure invalid configuration fails closed.
// =============================================================================

use std::path::PathBuf;

use crm_gate_config::AuditSinkKind;
use crm_gate_config::CrmGateConfig;
use crm_gate_config::EventSinkKind;
use crm_gate_config::ServerTransport;
use crm_gate_config::StoreType;
use crm_gate_config::config_toml_example;

mod common;

use crate::common::TestResult;
use crate::common::assert_invalid;
use crate::common::minimal_config;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_config_is_valid_with_defaults() -> TestResult {
    let mut config = minimal_config()?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.transport != ServerTransport::Stdio {
        return Err("default transport should be stdio".to_string());
    }
    if config.store.store_type != StoreType::Memory {
        return Err("default store should be memory".to_string());
    }
    if config.audit.sink != AuditSinkKind::Store || config.events.sink != EventSinkKind::Stderr {
        return Err("unexpected default sinks".to_string());
    }
    if config.server.max_body_bytes != 1024 * 1024 {
        return Err("unexpected default max_body_bytes".to_string());
    }
    Ok(())
}

#[test]
fn example_config_parses_and_validates() -> TestResult {
    let config =
        CrmGateConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.agents.len() != 2 {
        return Err(format!("expected 2 agents, got {}", config.agents.len()));
    }
    let front_desk = &config.agents[0];
    if !front_desk.permissions.is_enabled("leads", "create_lead") {
        return Err("front-desk should be able to create leads".to_string());
    }
    if front_desk.permissions.is_enabled("invoices", "get_invoices") {
        return Err("front-desk must not read invoices".to_string());
    }
    if config.store.sqlite_config().is_none() {
        return Err("example should select sqlite".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Server
// ============================================================================

#[test]
fn http_transport_requires_bind() -> TestResult {
    let mut config = minimal_config()?;
    config.server.transport = ServerTransport::Http;
    assert_invalid(config.validate(), "http transport requires bind address")
}

#[test]
fn http_transport_rejects_invalid_bind() -> TestResult {
    let mut config = minimal_config()?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = Some("not-an-address".to_string());
    assert_invalid(config.validate(), "invalid bind address")
}

#[test]
fn stdio_transport_rejects_bind() -> TestResult {
    let mut config = minimal_config()?;
    config.server.bind = Some("127.0.0.1:8080".to_string());
    assert_invalid(config.validate(), "stdio transport must not set bind address")
}

#[test]
fn max_body_bytes_bounds_are_enforced() -> TestResult {
    let mut config = minimal_config()?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "max_body_bytes must be greater than zero")?;
    config.server.max_body_bytes = 64 * 1024 * 1024;
    assert_invalid(config.validate(), "max_body_bytes exceeds limit")
}

// ============================================================================
// SECTION: Store and Sinks
// ============================================================================

#[test]
fn memory_store_rejects_path() -> TestResult {
    let mut config = minimal_config()?;
    config.store.path = Some(PathBuf::from("crm.db"));
    assert_invalid(config.validate(), "memory store must not set path")
}

#[test]
fn sqlite_store_requires_path() -> TestResult {
    let mut config = minimal_config()?;
    config.store.store_type = StoreType::Sqlite;
    assert_invalid(config.validate(), "sqlite store requires path")
}

#[test]
fn file_sinks_require_paths() -> TestResult {
    let mut config = minimal_config()?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "audit file sink requires path")?;
    config.audit.path = Some("audit.jsonl".to_string());
    config.validate().map_err(|err| err.to_string())?;
    config.events.sink = EventSinkKind::File;
    assert_invalid(config.validate(), "events file sink requires path")
}

#[test]
fn non_file_sinks_reject_paths() -> TestResult {
    let mut config = minimal_config()?;
    config.events.path = Some("events.jsonl".to_string());
    assert_invalid(config.validate(), "events.path is only valid for the file sink")
}

// ============================================================================
// SECTION: Seed Agents
// ============================================================================

#[test]
fn unknown_permission_tool_is_rejected() -> TestResult {
    let result = CrmGateConfig::from_toml_str(
        r#"
[[agents]]
agent_id = "a1"
name = "Assistant"

[agents.permissions.tasks]
enabled = true
tools = ["get_tasks", "run_payroll"]
"#,
    );
    assert_invalid(result.map(|_| ()), "unknown tool run_payroll")
}

#[test]
fn misplaced_permission_tool_is_rejected() -> TestResult {
    let result = CrmGateConfig::from_toml_str(
        r#"
[[agents]]
agent_id = "a1"
name = "Assistant"

[agents.permissions.tasks]
enabled = true
tools = ["get_leads"]
"#,
    );
    assert_invalid(result.map(|_| ()), "does not belong to tasks")
}

#[test]
fn unknown_permission_domain_is_rejected() -> TestResult {
    let result = CrmGateConfig::from_toml_str(
        r#"
[[agents]]
agent_id = "a1"
name = "Assistant"

[agents.permissions.payroll]
enabled = true
"#,
    );
    assert_invalid(result.map(|_| ()), "unknown domain payroll")
}

#[test]
fn duplicate_agents_are_rejected() -> TestResult {
    let result = CrmGateConfig::from_toml_str(
        r#"
[[agents]]
agent_id = "a1"
name = "One"

[[agents]]
agent_id = "a1"
name = "Two"
"#,
    );
    assert_invalid(result.map(|_| ()), "duplicate agent_id a1")
}

#[test]
fn blank_agent_id_is_rejected() -> TestResult {
    let result = CrmGateConfig::from_toml_str(
        r#"
[[agents]]
agent_id = "  "
name = "Blank"
"#,
    );
    assert_invalid(result.map(|_| ()), "agent_id must be non-empty")
}

#[test]
fn load_reads_file_from_disk() -> TestResult {
    let dir = tempfile::TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("crm-gate.toml");
    std::fs::write(&path, "[store]\ntype = \"memory\"\n").map_err(|err| err.to_string())?;
    let config = CrmGateConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Memory {
        return Err("expected memory store".to_string());
    }
    let missing = CrmGateConfig::load(Some(&dir.path().join("absent.toml")));
    assert_invalid(missing.map(|_| ()), "config io error")
}
