// crm-gate-mcp/src/tools/contacts.rs
// ============================================================================
// Module: Contact Tools
// Description: Field table for the contacts domain.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Contact fields. Only `name` is required.

use crm_gate_core::ResourceDomain;

use crate::schema::FieldSpec;
use crate::schema::ResourceSchema;
use crate::schema::ToolDescriptions;

/// Contact fields.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name", "Contact name.").required(),
    FieldSpec::text("phone", "Phone number."),
    FieldSpec::text("email", "Email address."),
    FieldSpec::text("company", "Company name."),
    FieldSpec::text("city", "City."),
    FieldSpec::text("notes", "Free-form notes."),
];

/// Contacts domain schema.
pub static SCHEMA: ResourceSchema = ResourceSchema {
    domain: ResourceDomain::Contacts,
    singular: "contact",
    fields: FIELDS,
    descriptions: ToolDescriptions {
        get: "List contacts filtered by name, phone, email, company, or city.",
        create: "Create a contact.",
        update: "Update fields of an existing contact by id.",
        delete: "Delete a contact by id.",
    },
};
