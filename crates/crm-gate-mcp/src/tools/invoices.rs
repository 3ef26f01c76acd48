// crm-gate-mcp/src/tools/invoices.rs
// ============================================================================
// Module: Invoice Tools
// Description: Field table for the invoices domain.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Invoice fields. `amount` is numeric and `status` defaults to `Draft`.

use crm_gate_core::ResourceDomain;

use crate::schema::FieldSpec;
use crate::schema::ResourceSchema;
use crate::schema::ToolDescriptions;

/// Allowed invoice statuses.
pub const INVOICE_STATUSES: &[&str] = &["Draft", "Sent", "Paid", "Overdue", "Cancelled"];

/// Invoice fields.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("invoice_number", "Human-facing invoice number.").required(),
    FieldSpec::text("customer_name", "Billed customer.").required(),
    FieldSpec::number("amount", "Invoice total.").required(),
    FieldSpec::choice("status", "Billing status.", INVOICE_STATUSES, "Draft"),
    FieldSpec::date("due_date", "Payment due date (ISO 8601)."),
    FieldSpec::text("notes", "Free-form notes."),
];

/// Invoices domain schema.
pub static SCHEMA: ResourceSchema = ResourceSchema {
    domain: ResourceDomain::Invoices,
    singular: "invoice",
    fields: FIELDS,
    descriptions: ToolDescriptions {
        get: "List invoices filtered by status, customer, or due date range.",
        create: "Create an invoice. Status defaults to Draft.",
        update: "Update fields of an existing invoice by id.",
        delete: "Delete an invoice by id.",
    },
};
