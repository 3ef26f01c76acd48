// crm-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: CRM Gate Runtime
// Description: In-process backends for CRM Gate interfaces.
// Purpose: Provide deterministic collaborators for tests and local runs.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime module ships [`InMemoryCrmStore`], which implements every
//! collaborator interface behind a single mutex.

pub mod store;

pub use store::InMemoryCrmStore;
pub use store::apply_patch;
