// crm-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite CRM Store
// Description: Durable CRM Gate backend using SQLite WAL.
// Purpose: Persist records, agents, permissions, and dispatch audit records.
// Dependencies: crm-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteCrmStore`], a SQLite-backed implementation of
//! every CRM Gate collaborator interface. Records are stored as JSON bodies
//! and filtered with `json_extract`, so list semantics match the in-memory
//! backend. Stored data is untrusted: malformed rows surface as corruption
//! errors rather than defaults.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteCrmStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
