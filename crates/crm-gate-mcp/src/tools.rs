// crm-gate-mcp/src/tools.rs
// ============================================================================
// Module: CRM Tool Catalog
// Description: Per-domain field tables and registry construction.
// Purpose: Register one handler for every canonical tool name.
// Dependencies: crate::{handlers, registry, schema}, crm-gate-core
// ============================================================================

//! ## Overview
//! Each domain module declares a static [`ResourceSchema`]. [`build_registry`]
//! walks [`ToolName::all`] and registers a [`RecordToolHandler`] for every
//! tool, so a missing domain or tool fails at startup rather than at call
//! time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod appointments;
pub mod contacts;
pub mod invoices;
pub mod leads;
pub mod tasks;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crm_gate_core::RecordStore;
use crm_gate_core::ResourceDomain;
use crm_gate_core::ToolName;

use crate::handlers::RecordToolHandler;
use crate::registry::RegistryError;
use crate::registry::ToolRegistry;
use crate::schema::ResourceSchema;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns the field table for a resource domain.
#[must_use]
pub fn schema_for(domain: ResourceDomain) -> &'static ResourceSchema {
    match domain {
        ResourceDomain::Tasks => &tasks::SCHEMA,
        ResourceDomain::Leads => &leads::SCHEMA,
        ResourceDomain::Contacts => &contacts::SCHEMA,
        ResourceDomain::Appointments => &appointments::SCHEMA,
        ResourceDomain::Invoices => &invoices::SCHEMA,
    }
}

/// Builds a complete registry backed by `store`.
///
/// # Errors
///
/// Returns [`RegistryError`] when a schema fails to compile or a tool is
/// left without a handler.
pub fn build_registry(store: &Arc<dyn RecordStore>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    for tool in ToolName::all() {
        let schema = schema_for(tool.domain());
        let operation = tool.operation();
        registry.register(
            *tool,
            schema.description(operation),
            schema.arguments_schema(operation),
            Arc::new(RecordToolHandler::new(schema, operation, Arc::clone(store))),
        )?;
    }
    registry.ensure_complete()?;
    Ok(registry)
}
