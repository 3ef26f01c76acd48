// crm-gate-mcp/src/tools/leads.rs
// ============================================================================
// Module: Lead Tools
// Description: Field table for the leads domain.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Lead fields. `name` and `phone` are required; duplicate phones are
//! allowed and create distinct leads.

use crm_gate_core::ResourceDomain;

use crate::schema::FieldSpec;
use crate::schema::ResourceSchema;
use crate::schema::ToolDescriptions;

/// Allowed lead statuses.
pub const LEAD_STATUSES: &[&str] = &["New", "Contacted", "Qualified", "Won", "Lost"];

/// Lead fields.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name", "Lead name.").required(),
    FieldSpec::text("phone", "Phone number.").required(),
    FieldSpec::text("email", "Email address."),
    FieldSpec::text("source", "Acquisition channel."),
    FieldSpec::choice("status", "Pipeline status.", LEAD_STATUSES, "New"),
    FieldSpec::number("value", "Estimated deal value."),
    FieldSpec::text("notes", "Free-form notes."),
];

/// Leads domain schema.
pub static SCHEMA: ResourceSchema = ResourceSchema {
    domain: ResourceDomain::Leads,
    singular: "lead",
    fields: FIELDS,
    descriptions: ToolDescriptions {
        get: "List leads filtered by status, source, phone, or email.",
        create: "Create a lead. Status defaults to New.",
        update: "Update fields of an existing lead by id.",
        delete: "Delete a lead by id.",
    },
};
