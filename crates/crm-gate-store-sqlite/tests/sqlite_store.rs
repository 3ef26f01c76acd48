// crm-gate-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SqliteCrmStore behavior.
// Purpose: Ensure durable persistence and list semantics match the contract.
// Dependencies: crm-gate-store-sqlite, crm-gate-core, rusqlite, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed CRM store. Exercises record CRUD,
//! filter and ordering semantics, agent and permission administration, the
//! dispatch audit trail, and fail-closed handling of tampered rows.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use crm_gate_core::Agent;
use crm_gate_core::AgentAdmin;
use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::DispatchOutcome;
use crm_gate_core::DispatchRecord;
use crm_gate_core::DomainGrant;
use crm_gate_core::FieldFilter;
use crm_gate_core::FilterOp;
use crm_gate_core::PermissionMap;
use crm_gate_core::PermissionStore;
use crm_gate_core::RecordId;
use crm_gate_core::RecordQuery;
use crm_gate_core::RecordStore;
use crm_gate_core::ResourceDomain;
use crm_gate_core::SortKey;
use crm_gate_core::SortOrder;
use crm_gate_core::StoreError;
use crm_gate_core::StoredRecord;
use crm_gate_core::Timestamp;
use crm_gate_store_sqlite::SqliteCrmStore;
use crm_gate_store_sqlite::SqliteStoreConfig;
use crm_gate_store_sqlite::SqliteStoreError;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store(dir: &TempDir) -> SqliteCrmStore {
    SqliteCrmStore::new(&SqliteStoreConfig::new(dir.path().join("crm.sqlite"))).unwrap()
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn seed_invoices(store: &SqliteCrmStore) -> Vec<RecordId> {
    let rows = [
        json!({"invoice_number": "INV-1", "customer_name": "Acme", "amount": 100, "status": "Paid"}),
        json!({"invoice_number": "INV-2", "customer_name": "Beta", "amount": 250.5, "status": "Sent"}),
        json!({"invoice_number": "INV-3", "customer_name": "acme", "amount": 75, "status": "Paid"}),
        json!({"invoice_number": "INV-4", "customer_name": "Acme", "status": "Draft"}),
    ];
    rows.into_iter()
        .map(|row| store.insert(ResourceDomain::Invoices, fields(row)).unwrap().id)
        .collect()
}

fn numbers(records: &[StoredRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.fields["invoice_number"].as_str().unwrap().to_string())
        .collect()
}

fn sample_record(agent: &str, outcome: DispatchOutcome) -> DispatchRecord {
    DispatchRecord {
        agent_id: AgentId::new(agent),
        domain: "tasks".to_string(),
        tool: "get_tasks".to_string(),
        outcome,
        error: None,
        context: json!({"count": 0}),
        request_id: Some("req-1".to_string()),
        recorded_at: Timestamp::now(),
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

#[test]
fn records_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let store = open_store(&dir);
        store.insert(ResourceDomain::Contacts, fields(json!({"name": "Ana"}))).unwrap().id
    };
    let store = open_store(&dir);
    let loaded = store.get(ResourceDomain::Contacts, &id).unwrap().unwrap();
    assert_eq!(loaded.fields["name"], json!("Ana"));
    assert!(store.get(ResourceDomain::Leads, &id).unwrap().is_none());
}

#[test]
fn default_order_is_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_invoices(&store);
    let records = store.query(ResourceDomain::Invoices, &RecordQuery::default()).unwrap();
    assert_eq!(numbers(&records), vec!["INV-4", "INV-3", "INV-2", "INV-1"]);
}

#[test]
fn created_at_sort_matches_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let inserted: Vec<RecordId> = (0..40)
        .map(|n| store.insert(ResourceDomain::Tasks, fields(json!({"title": n}))).unwrap().id)
        .collect();
    let query = |order| RecordQuery {
        sort: Some(SortKey {
            field: "created_at".to_string(),
            order,
        }),
        limit: 100,
        ..RecordQuery::default()
    };

    let ascending = store.query(ResourceDomain::Tasks, &query(SortOrder::Asc)).unwrap();
    let descending = store.query(ResourceDomain::Tasks, &query(SortOrder::Desc)).unwrap();

    let ascending_ids: Vec<RecordId> = ascending.iter().map(|r| r.id.clone()).collect();
    let mut descending_ids: Vec<RecordId> = descending.iter().map(|r| r.id.clone()).collect();
    descending_ids.reverse();
    assert_eq!(ascending_ids, inserted);
    assert_eq!(descending_ids, inserted);
    assert!(ascending.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));
    let width = ascending[0].created_at.as_str().len();
    assert!(ascending.iter().all(|r| r.created_at.as_str().len() == width));
}

#[test]
fn equality_filters_are_exact() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_invoices(&store);
    let query = RecordQuery {
        filters: vec![FieldFilter::eq("customer_name", json!("Acme"))],
        ..RecordQuery::default()
    };
    let records = store.query(ResourceDomain::Invoices, &query).unwrap();
    assert_eq!(numbers(&records), vec!["INV-4", "INV-1"]);

    let query = RecordQuery {
        filters: vec![FieldFilter::eq("amount", json!(100.0))],
        ..RecordQuery::default()
    };
    let records = store.query(ResourceDomain::Invoices, &query).unwrap();
    assert_eq!(numbers(&records), vec!["INV-1"]);
}

#[test]
fn id_filter_selects_one_record() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let ids = seed_invoices(&store);
    let query = RecordQuery {
        filters: vec![FieldFilter::eq("id", json!(ids[2].as_str()))],
        ..RecordQuery::default()
    };
    let records = store.query(ResourceDomain::Invoices, &query).unwrap();
    assert_eq!(numbers(&records), vec!["INV-3"]);
}

#[test]
fn numeric_sort_places_missing_values_last() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_invoices(&store);
    let query = RecordQuery {
        sort: Some(SortKey {
            field: "amount".to_string(),
            order: SortOrder::Desc,
        }),
        ..RecordQuery::default()
    };
    let records = store.query(ResourceDomain::Invoices, &query).unwrap();
    assert_eq!(numbers(&records), vec!["INV-2", "INV-1", "INV-3", "INV-4"]);
}

#[test]
fn range_filter_and_pagination_combine() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    seed_invoices(&store);
    let query = RecordQuery {
        filters: vec![FieldFilter {
            field: "amount".to_string(),
            op: FilterOp::Gte,
            value: json!(75),
        }],
        sort: Some(SortKey {
            field: "amount".to_string(),
            order: SortOrder::Asc,
        }),
        limit: 2,
        offset: 1,
    };
    let records = store.query(ResourceDomain::Invoices, &query).unwrap();
    assert_eq!(numbers(&records), vec!["INV-1", "INV-2"]);
}

#[test]
fn update_and_delete_report_missing_records() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let ids = seed_invoices(&store);
    let updated = store
        .update(ResourceDomain::Invoices, &ids[1], fields(json!({"status": "Paid", "amount": null})))
        .unwrap()
        .unwrap();
    assert_eq!(updated.fields["status"], json!("Paid"));
    assert!(!updated.fields.contains_key("amount"));
    let reloaded = store.get(ResourceDomain::Invoices, &ids[1]).unwrap().unwrap();
    assert_eq!(reloaded.fields, updated.fields);

    let missing = RecordId::new("missing");
    assert!(store.update(ResourceDomain::Invoices, &missing, Map::new()).unwrap().is_none());
    assert!(store.delete(ResourceDomain::Invoices, &ids[0]).unwrap());
    assert!(!store.delete(ResourceDomain::Invoices, &ids[0]).unwrap());
}

// ============================================================================
// SECTION: Agents and Permissions
// ============================================================================

#[test]
fn agents_and_permissions_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let agent_id = AgentId::new("agent-7");
    store.upsert_agent(&Agent::active("agent-7", "Front desk")).unwrap();
    let map = PermissionMap::empty().with_domain("leads", DomainGrant::enabled(["get_leads"]));
    store.set_permissions(&agent_id, &map).unwrap();

    assert_eq!(store.permissions(&agent_id).unwrap(), Some(map));
    let mut agent = store.agent(&agent_id).unwrap().unwrap();
    assert!(agent.is_active());
    agent.status = AgentStatus::Inactive;
    store.upsert_agent(&agent).unwrap();
    assert!(!store.agent(&agent_id).unwrap().unwrap().is_active());
    assert_eq!(store.list_agents().unwrap().len(), 1);
}

#[test]
fn permissions_for_unknown_agent_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let result = store.set_permissions(&AgentId::new("ghost"), &PermissionMap::empty());
    assert!(matches!(result, Err(StoreError::Invalid(_))));
    assert!(store.permissions(&AgentId::new("ghost")).unwrap().is_none());
}

#[test]
fn tampered_permissions_fail_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crm.sqlite");
    {
        let store = SqliteCrmStore::new(&SqliteStoreConfig::new(&path)).unwrap();
        store.upsert_agent(&Agent::active("agent-1", "Ops")).unwrap();
        store.set_permissions(&AgentId::new("agent-1"), &PermissionMap::empty()).unwrap();
    }
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute(
            "UPDATE agent_permissions SET permissions_json = '[\"tasks\"]' WHERE agent_id = 'agent-1'",
            [],
        )
        .unwrap();
    drop(connection);

    let store = SqliteCrmStore::new(&SqliteStoreConfig::new(&path)).unwrap();
    let result = store.permissions(&AgentId::new("agent-1"));
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

// ============================================================================
// SECTION: Audit Trail and Schema
// ============================================================================

#[test]
fn dispatch_records_append_in_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.append(&sample_record("a", DispatchOutcome::Success)).unwrap();
    store.append(&sample_record("b", DispatchOutcome::Denied)).unwrap();
    store.append(&sample_record("c", DispatchOutcome::Error)).unwrap();

    let all = store.dispatch_records().unwrap();
    let agents: Vec<&str> = all.iter().map(|record| record.agent_id.as_str()).collect();
    assert_eq!(agents, vec!["a", "b", "c"]);
    assert_eq!(all[1].outcome, DispatchOutcome::Denied);
    assert_eq!(all[0].context, json!({"count": 0}));

    let recent = store.recent_dispatch_records(2).unwrap();
    let agents: Vec<&str> = recent.iter().map(|record| record.agent_id.as_str()).collect();
    assert_eq!(agents, vec!["b", "c"]);
}

#[test]
fn schema_version_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crm.sqlite");
    drop(SqliteCrmStore::new(&SqliteStoreConfig::new(&path)).unwrap());
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);

    let result = SqliteCrmStore::new(&SqliteStoreConfig::new(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SqliteCrmStore::new(&SqliteStoreConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}
