// crm-gate-config/src/lib.rs
// ============================================================================
// Module: CRM Gate Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for crm-gate.toml semantics.
// Dependencies: crm-gate-core, crm-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `crm-gate-config` defines the configuration model for the CRM Gate MCP
//! server: transport, record store backend, audit and event sinks, and seed
//! agents with their permission maps. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
