// crm-gate-core/src/lib.rs
// ============================================================================
// Module: CRM Gate Core Library
// Description: Public API surface for the CRM Gate core.
// Purpose: Expose domain types, collaborator interfaces, and in-memory stores.
// Dependencies: crate::{core, interfaces, runtime, tooling}
// ============================================================================

//! ## Overview
//! CRM Gate core defines the data model shared by the dispatcher and its
//! collaborators: agents, permission maps, dispatch records, CRM records and
//! record queries, plus the canonical tool catalog. Backends integrate through
//! the traits in [`interfaces`]; [`runtime`] ships an in-memory backend for
//! tests and local development.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AgentAdmin;
pub use interfaces::AgentDirectory;
pub use interfaces::DispatchAuditSink;
pub use interfaces::PermissionStore;
pub use interfaces::RecordStore;
pub use interfaces::StoreError;
pub use runtime::InMemoryCrmStore;
pub use tooling::ResourceDomain;
pub use tooling::ToolName;
pub use tooling::ToolOperation;
