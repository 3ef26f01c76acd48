// crm-gate-mcp/src/tools/tasks.rs
// ============================================================================
// Module: Task Tools
// Description: Field table for the tasks domain.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Task fields and statuses. `title` is required; `status` defaults to
//! `To Do` and `priority` to `Medium`. `due_date` supports range filters.

use crm_gate_core::ResourceDomain;

use crate::schema::FieldSpec;
use crate::schema::ResourceSchema;
use crate::schema::ToolDescriptions;

/// Allowed task statuses.
pub const TASK_STATUSES: &[&str] = &["To Do", "In Progress", "In Review", "Completed"];
/// Allowed task priorities.
pub const TASK_PRIORITIES: &[&str] = &["Low", "Medium", "High", "Urgent"];

/// Task fields.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("title", "Short task title.").required(),
    FieldSpec::text("description", "Task details."),
    FieldSpec::choice("status", "Workflow status.", TASK_STATUSES, "To Do"),
    FieldSpec::choice("priority", "Task priority.", TASK_PRIORITIES, "Medium"),
    FieldSpec::date("due_date", "Due date (ISO 8601)."),
    FieldSpec::text("assigned_to", "Assignee name or identifier."),
    FieldSpec::text("contact_id", "Related contact id."),
];

/// Tasks domain schema.
pub static SCHEMA: ResourceSchema = ResourceSchema {
    domain: ResourceDomain::Tasks,
    singular: "task",
    fields: FIELDS,
    descriptions: ToolDescriptions {
        get: "List tasks filtered by status, priority, assignee, or due date range.",
        create: "Create a task. Status defaults to To Do and priority to Medium.",
        update: "Update fields of an existing task by id.",
        delete: "Delete a task by id.",
    },
};
