// crm-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: CRM Gate Interfaces
// Description: Backend-agnostic interfaces for records, agents, and audit.
// Purpose: Define the collaborator surfaces used by the tool dispatcher.
// Dependencies: crate::core, crate::tooling
// ============================================================================

//! ## Overview
//! Interfaces define how CRM Gate integrates with storage without embedding
//! backend-specific details. Every call is a single blocking operation; the
//! dispatcher never retries. Implementations must fail closed: a lookup that
//! cannot be answered is an error, never a fabricated default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::Agent;
use crate::core::AgentId;
use crate::core::DispatchRecord;
use crate::core::PermissionMap;
use crate::core::RecordId;
use crate::core::RecordQuery;
use crate::core::StoredRecord;
use crate::tooling::ResourceDomain;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Collaborator store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Request or stored data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Persistence for CRM records, partitioned by resource domain.
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns it with store-assigned id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert(
        &self,
        domain: ResourceDomain,
        fields: Map<String, Value>,
    ) -> Result<StoredRecord, StoreError>;

    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get(&self, domain: ResourceDomain, id: &RecordId)
    -> Result<Option<StoredRecord>, StoreError>;

    /// Lists records matching the query, ordered and paginated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn query(
        &self,
        domain: ResourceDomain,
        query: &RecordQuery,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Merges `patch` into an existing record. Null values clear a field.
    /// Returns `None` when no record has the id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn update(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
        patch: Map<String, Value>,
    ) -> Result<Option<StoredRecord>, StoreError>;

    /// Deletes a record. Returns false when no record has the id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete(&self, domain: ResourceDomain, id: &RecordId) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: Agents and Permissions
// ============================================================================

/// Read-only agent lookup used during dispatch.
pub trait AgentDirectory: Send + Sync {
    /// Loads an agent by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, StoreError>;
}

/// Read-only permission lookup used during dispatch.
pub trait PermissionStore: Send + Sync {
    /// Loads the permission map for an agent. `None` means no map is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails or the stored map is
    /// malformed.
    fn permissions(&self, agent_id: &AgentId) -> Result<Option<PermissionMap>, StoreError>;
}

/// Administrative writes for agents and permissions.
///
/// Used by configuration seeding and the CLI. The dispatcher never holds this
/// interface.
pub trait AgentAdmin: Send + Sync {
    /// Inserts or replaces an agent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn upsert_agent(&self, agent: &Agent) -> Result<(), StoreError>;

    /// Replaces the permission map for an agent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the agent is unknown or the write fails.
    fn set_permissions(&self, agent_id: &AgentId, map: &PermissionMap) -> Result<(), StoreError>;

    /// Lists agents ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_agents(&self) -> Result<Vec<Agent>, StoreError>;
}

// ============================================================================
// SECTION: Dispatch Audit
// ============================================================================

/// Append-only sink for dispatch audit records.
pub trait DispatchAuditSink: Send + Sync {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be persisted.
    fn append(&self, record: &DispatchRecord) -> Result<(), StoreError>;
}
