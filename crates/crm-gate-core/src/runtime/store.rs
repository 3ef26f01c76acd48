// crm-gate-core/src/runtime/store.rs
// ============================================================================
// Module: CRM Gate In-Memory Store
// Description: In-memory records, agents, permissions, and audit trail.
// Purpose: Provide a deterministic backend without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryCrmStore`] implements every collaborator interface over shared
//! state guarded by one mutex. Clones share state. It is intended for tests
//! and local demos; nothing survives the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Map;
use serde_json::Value;

use crate::core::Agent;
use crate::core::AgentId;
use crate::core::DispatchRecord;
use crate::core::PermissionMap;
use crate::core::RecordId;
use crate::core::RecordQuery;
use crate::core::StoredRecord;
use crate::core::Timestamp;
use crate::interfaces::AgentAdmin;
use crate::interfaces::AgentDirectory;
use crate::interfaces::DispatchAuditSink;
use crate::interfaces::PermissionStore;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;
use crate::tooling::ResourceDomain;

// ============================================================================
// SECTION: State
// ============================================================================

/// Stored record plus its insertion sequence.
#[derive(Debug, Clone)]
struct MemoryRow {
    /// Monotonic insertion sequence; larger is newer.
    seq: u64,
    /// Record contents.
    record: StoredRecord,
}

/// Mutable state shared by store clones.
#[derive(Debug, Default)]
struct MemoryState {
    /// Records keyed by domain, then by id.
    records: BTreeMap<ResourceDomain, BTreeMap<RecordId, MemoryRow>>,
    /// Next insertion sequence.
    next_seq: u64,
    /// Registered agents.
    agents: BTreeMap<AgentId, Agent>,
    /// Permission maps keyed by agent.
    permissions: BTreeMap<AgentId, PermissionMap>,
    /// Dispatch audit trail in append order.
    audit: Vec<DispatchRecord>,
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory CRM store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCrmStore {
    /// Shared state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryCrmStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the dispatch audit trail in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state mutex is poisoned.
    pub fn dispatch_records(&self) -> Result<Vec<DispatchRecord>, StoreError> {
        Ok(self.lock()?.audit.clone())
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("crm store mutex poisoned".to_string()))
    }
}

impl RecordStore for InMemoryCrmStore {
    fn insert(
        &self,
        domain: ResourceDomain,
        fields: Map<String, Value>,
    ) -> Result<StoredRecord, StoreError> {
        let mut guard = self.lock()?;
        let now = Timestamp::now();
        let record = StoredRecord {
            id: RecordId::generate(),
            fields,
            created_at: now.clone(),
            updated_at: now,
        };
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.records.entry(domain).or_default().insert(
            record.id.clone(),
            MemoryRow {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    fn get(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.records.get(&domain).and_then(|rows| rows.get(id)).map(|row| row.record.clone()))
    }

    fn query(
        &self,
        domain: ResourceDomain,
        query: &RecordQuery,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let guard = self.lock()?;
        let Some(rows) = guard.records.get(&domain) else {
            return Ok(Vec::new());
        };
        let sequences: BTreeMap<&RecordId, u64> =
            rows.values().map(|row| (&row.record.id, row.seq)).collect();
        let mut matched: Vec<StoredRecord> = rows
            .values()
            .filter(|row| query.matches(&row.record))
            .map(|row| row.record.clone())
            .collect();
        query.sort_records(&mut matched, |record| {
            sequences.get(&record.id).copied().unwrap_or_default()
        });
        Ok(query.paginate(matched))
    }

    fn update(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
        patch: Map<String, Value>,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let mut guard = self.lock()?;
        let Some(row) = guard.records.get_mut(&domain).and_then(|rows| rows.get_mut(id)) else {
            return Ok(None);
        };
        apply_patch(&mut row.record.fields, patch);
        row.record.updated_at = Timestamp::now();
        Ok(Some(row.record.clone()))
    }

    fn delete(&self, domain: ResourceDomain, id: &RecordId) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        Ok(guard.records.get_mut(&domain).is_some_and(|rows| rows.remove(id).is_some()))
    }
}

impl AgentDirectory for InMemoryCrmStore {
    fn agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Ok(self.lock()?.agents.get(agent_id).cloned())
    }
}

impl PermissionStore for InMemoryCrmStore {
    fn permissions(&self, agent_id: &AgentId) -> Result<Option<PermissionMap>, StoreError> {
        Ok(self.lock()?.permissions.get(agent_id).cloned())
    }
}

impl AgentAdmin for InMemoryCrmStore {
    fn upsert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        self.lock()?.agents.insert(agent.agent_id.clone(), agent.clone());
        Ok(())
    }

    fn set_permissions(&self, agent_id: &AgentId, map: &PermissionMap) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if !guard.agents.contains_key(agent_id) {
            return Err(StoreError::Invalid(format!("unknown agent: {agent_id}")));
        }
        guard.permissions.insert(agent_id.clone(), map.clone());
        Ok(())
    }

    fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(self.lock()?.agents.values().cloned().collect())
    }
}

impl DispatchAuditSink for InMemoryCrmStore {
    fn append(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        self.lock()?.audit.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Merges a patch into a field map; null values remove the field.
pub fn apply_patch(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            fields.remove(&key);
        } else {
            fields.insert(key, value);
        }
    }
}
