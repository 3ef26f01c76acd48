// crm-gate-mcp/src/tools/appointments.rs
// ============================================================================
// Module: Appointment Tools
// Description: Field table for the appointments domain.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Appointment fields. `start_time` and `end_time` support range filters;
//! `status` defaults to `Scheduled`.

use crm_gate_core::ResourceDomain;

use crate::schema::FieldSpec;
use crate::schema::ResourceSchema;
use crate::schema::ToolDescriptions;

/// Allowed appointment statuses.
pub const APPOINTMENT_STATUSES: &[&str] = &["Scheduled", "Completed", "Cancelled", "No Show"];

/// Appointment fields.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", "Appointment title.").required(),
    FieldSpec::date("start_time", "Start time (ISO 8601).").required(),
    FieldSpec::date("end_time", "End time (ISO 8601)."),
    FieldSpec::choice("status", "Appointment status.", APPOINTMENT_STATUSES, "Scheduled"),
    FieldSpec::text("contact_id", "Related contact id."),
    FieldSpec::text("location", "Meeting location."),
    FieldSpec::text("notes", "Free-form notes."),
];

/// Appointments domain schema.
pub static SCHEMA: ResourceSchema = ResourceSchema {
    domain: ResourceDomain::Appointments,
    singular: "appointment",
    fields: FIELDS,
    descriptions: ToolDescriptions {
        get: "List appointments filtered by status, contact, or start time range.",
        create: "Book an appointment. Status defaults to Scheduled.",
        update: "Reschedule or update an appointment by id.",
        delete: "Delete an appointment by id.",
    },
};
