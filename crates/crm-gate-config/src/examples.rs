// crm-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for CRM Gate configuration. The output parses and
//! validates against [`crate::CrmGateConfig`].

/// Returns a canonical example `crm-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
transport = "http"
bind = "127.0.0.1:8750"
max_body_bytes = 1048576

[store]
type = "sqlite"
path = "crm-gate.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[audit]
sink = "store"

[events]
sink = "stderr"

[[agents]]
agent_id = "front-desk"
name = "Front desk assistant"

[agents.permissions.leads]
enabled = true
tools = ["get_leads", "create_lead", "update_lead"]

[agents.permissions.appointments]
enabled = true
tools = ["get_appointments", "create_appointment"]

[[agents]]
agent_id = "billing"
name = "Billing assistant"
status = "active"

[agents.permissions.invoices]
enabled = true
tools = ["get_invoices", "create_invoice", "update_invoice"]
"#,
    )
}
