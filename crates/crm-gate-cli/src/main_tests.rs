// crm-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and store administration.
// Purpose: Ensure agent and permission edits land in the store as intended.
// Dependencies: crm-gate-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Drives the administrative helpers against a temporary `SQLite` store.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use clap::CommandFactory;
use clap::Parser;
use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::DispatchOutcome;
use crm_gate_core::DispatchRecord;
use crm_gate_core::PermissionStore;
use crm_gate_core::ResourceDomain;
use crm_gate_core::Timestamp;
use serde_json::json;
use tempfile::TempDir;

use super::AgentCommand;
use super::Cli;
use super::CliError;
use super::Commands;
use super::DomainArg;
use super::add_agent;
use super::grant_tools;
use super::open_store;
use super::render_tools;
use super::revoke_domain;
use super::tail_records;
use super::tool_definitions;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn temp_store() -> (TempDir, super::SqliteCrmStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir.path().join("crm.db")).expect("store");
    (dir, store)
}

fn record(tool: &str, outcome: DispatchOutcome) -> DispatchRecord {
    DispatchRecord {
        agent_id: AgentId::new("A1"),
        domain: "tasks".to_string(),
        tool: tool.to_string(),
        outcome,
        error: None,
        context: json!({}),
        request_id: None,
        recorded_at: Timestamp::now(),
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn grant_parses_repeated_tools() {
    let cli = Cli::try_parse_from([
        "crm-gate",
        "agent",
        "grant",
        "--db",
        "crm.db",
        "--agent-id",
        "A1",
        "--domain",
        "tasks",
        "--tool",
        "get_tasks",
        "--tool",
        "create_task",
    ])
    .expect("parse");
    let Commands::Agent {
        command: AgentCommand::Grant(grant),
    } = cli.command
    else {
        panic!("expected agent grant");
    };
    assert_eq!(grant.domain, DomainArg::Tasks);
    assert_eq!(grant.tools, vec!["get_tasks".to_string(), "create_task".to_string()]);
}

#[test]
fn unknown_domain_is_rejected_by_parser() {
    let result = Cli::try_parse_from([
        "crm-gate", "agent", "revoke", "--db", "crm.db", "--agent-id", "A1", "--domain", "widgets",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Agent Administration
// ============================================================================

#[test]
fn new_agent_starts_with_empty_permissions() {
    let (_dir, store) = temp_store();
    let agent = add_agent(&store, "A1", "Front Desk", AgentStatus::Active).expect("add");

    assert_eq!(store.agent(&agent.agent_id).unwrap(), Some(agent.clone()));
    assert!(store.permissions(&agent.agent_id).unwrap().expect("map").is_empty());
}

#[test]
fn re_adding_agent_keeps_permissions() {
    let (_dir, store) = temp_store();
    add_agent(&store, "A1", "Front Desk", AgentStatus::Active).expect("add");
    grant_tools(&store, "A1", ResourceDomain::Tasks, &["get_tasks".to_string()]).expect("grant");

    add_agent(&store, "A1", "Front Desk", AgentStatus::Inactive).expect("re-add");

    let map = store.permissions(&AgentId::new("A1")).unwrap().expect("map");
    assert!(map.is_enabled("tasks", "get_tasks"));
    assert!(!store.agent(&AgentId::new("A1")).unwrap().expect("agent").is_active());
}

#[test]
fn blank_agent_id_is_rejected() {
    let (_dir, store) = temp_store();
    let err = add_agent(&store, "  ", "Nobody", AgentStatus::Active).unwrap_err();
    assert!(matches!(err, CliError::Invalid(_)));
}

#[test]
fn grant_merges_tools_within_domain() {
    let (_dir, store) = temp_store();
    add_agent(&store, "A1", "Front Desk", AgentStatus::Active).expect("add");

    grant_tools(&store, "A1", ResourceDomain::Tasks, &["get_tasks".to_string()]).expect("grant");
    let map = grant_tools(&store, "A1", ResourceDomain::Tasks, &["create_task".to_string()])
        .expect("grant");

    assert!(map.is_enabled("tasks", "get_tasks"));
    assert!(map.is_enabled("tasks", "create_task"));
    assert!(!map.is_enabled("tasks", "delete_task"));
    assert_eq!(store.permissions(&AgentId::new("A1")).unwrap(), Some(map));
}

#[test]
fn grant_without_tools_enables_whole_domain() {
    let (_dir, store) = temp_store();
    add_agent(&store, "A1", "Billing", AgentStatus::Active).expect("add");

    let map = grant_tools(&store, "A1", ResourceDomain::Invoices, &[]).expect("grant");

    for tool in ["get_invoices", "create_invoice", "update_invoice", "delete_invoice"] {
        assert!(map.is_enabled("invoices", tool), "{tool} should be enabled");
    }
    assert!(!map.is_enabled("tasks", "get_tasks"));
}

#[test]
fn grant_rejects_tool_from_other_domain() {
    let (_dir, store) = temp_store();
    add_agent(&store, "A1", "Front Desk", AgentStatus::Active).expect("add");

    let err = grant_tools(&store, "A1", ResourceDomain::Leads, &["get_tasks".to_string()])
        .unwrap_err();

    assert!(matches!(err, CliError::Invalid(_)));
    assert!(store.permissions(&AgentId::new("A1")).unwrap().expect("map").is_empty());
}

#[test]
fn grant_requires_existing_agent() {
    let (_dir, store) = temp_store();
    let err = grant_tools(&store, "ghost", ResourceDomain::Tasks, &[]).unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn revoke_disables_domain() {
    let (_dir, store) = temp_store();
    add_agent(&store, "A1", "Front Desk", AgentStatus::Active).expect("add");
    grant_tools(&store, "A1", ResourceDomain::Tasks, &[]).expect("grant");
    grant_tools(&store, "A1", ResourceDomain::Leads, &["get_leads".to_string()]).expect("grant");

    let map = revoke_domain(&store, "A1", ResourceDomain::Tasks).expect("revoke");

    assert!(!map.is_enabled("tasks", "get_tasks"));
    assert!(map.is_enabled("leads", "get_leads"));
}

// ============================================================================
// SECTION: Audit and Tools
// ============================================================================

#[test]
fn tail_returns_most_recent_records_in_order() {
    let (_dir, store) = temp_store();
    store.append(&record("get_tasks", DispatchOutcome::Success)).expect("append");
    store.append(&record("create_task", DispatchOutcome::Denied)).expect("append");
    store.append(&record("delete_task", DispatchOutcome::Error)).expect("append");

    let records = tail_records(&store, 2).expect("tail");

    let tools: Vec<&str> = records.iter().map(|r| r.tool.as_str()).collect();
    assert_eq!(tools, vec!["create_task", "delete_task"]);
}

#[test]
fn tail_rejects_zero_limit() {
    let (_dir, store) = temp_store();
    assert!(matches!(tail_records(&store, 0), Err(CliError::Invalid(_))));
}

#[test]
fn tools_render_one_line_per_tool() {
    let definitions = tool_definitions().expect("definitions");
    let rendered = render_tools(&definitions);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 20);
    assert!(lines[0].starts_with("get_tasks"));
    assert!(lines[19].starts_with("delete_invoice"));
    assert!(lines.iter().all(|line| line.contains("  ")));
}
