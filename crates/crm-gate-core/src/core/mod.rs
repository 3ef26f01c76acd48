// crm-gate-core/src/core/mod.rs
// ============================================================================
// Module: CRM Gate Core Types
// Description: Data model for agents, permissions, records, and audit entries.
// Purpose: Group the serializable types shared across CRM Gate crates.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types are plain data with stable serde forms. Behavior lives next to
//! the type it belongs to (permission checks on [`PermissionMap`], filter
//! evaluation on [`RecordQuery`]).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod agent;
pub mod audit;
pub mod identifiers;
pub mod permissions;
pub mod record;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agent::Agent;
pub use agent::AgentStatus;
pub use audit::DispatchOutcome;
pub use audit::DispatchRecord;
pub use identifiers::AgentId;
pub use identifiers::RecordId;
pub use permissions::DomainGrant;
pub use permissions::PermissionMap;
pub use record::FieldFilter;
pub use record::FilterOp;
pub use record::RecordQuery;
pub use record::SortKey;
pub use record::SortOrder;
pub use record::StoredRecord;
pub use record::compare_values;
pub use record::values_equal;
pub use time::Timestamp;
