// crm-gate-core/src/tooling.rs
// ============================================================================
// Module: Tooling Identifiers
// Description: Canonical MCP tool identifiers for CRM Gate.
// Purpose: Shared tool naming across the registry, permissions, and config.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Canonical tool identifiers exposed over MCP. Each tool belongs to exactly
//! one [`ResourceDomain`] and performs one [`ToolOperation`]. These names are
//! part of the external contract surface and of every stored permission map.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Resource Domains
// ============================================================================

/// CRM resource domain a tool operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceDomain {
    /// Work items assigned to staff.
    Tasks,
    /// Sales prospects.
    Leads,
    /// People and organizations.
    Contacts,
    /// Scheduled meetings.
    Appointments,
    /// Billing documents.
    Invoices,
}

impl ResourceDomain {
    /// Returns the canonical domain key used in permission maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Leads => "leads",
            Self::Contacts => "contacts",
            Self::Appointments => "appointments",
            Self::Invoices => "invoices",
        }
    }

    /// Returns all domains in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Tasks, Self::Leads, Self::Contacts, Self::Appointments, Self::Invoices]
    }

    /// Parses a domain key.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "tasks" => Some(Self::Tasks),
            "leads" => Some(Self::Leads),
            "contacts" => Some(Self::Contacts),
            "appointments" => Some(Self::Appointments),
            "invoices" => Some(Self::Invoices),
            _ => None,
        }
    }

    /// Returns the tools that belong to this domain.
    pub fn tools(self) -> impl Iterator<Item = ToolName> {
        ToolName::all().iter().copied().filter(move |tool| tool.domain() == self)
    }
}

impl fmt::Display for ResourceDomain {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// CRUD operation performed by a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOperation {
    /// List records with filters.
    Get,
    /// Insert a record.
    Create,
    /// Patch a record by id.
    Update,
    /// Remove a record by id.
    Delete,
}

impl ToolOperation {
    /// Returns the operation label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical tool names for CRM Gate MCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// List tasks.
    GetTasks,
    /// Create a task.
    CreateTask,
    /// Update a task.
    UpdateTask,
    /// Delete a task.
    DeleteTask,
    /// List leads.
    GetLeads,
    /// Create a lead.
    CreateLead,
    /// Update a lead.
    UpdateLead,
    /// Delete a lead.
    DeleteLead,
    /// List contacts.
    GetContacts,
    /// Create a contact.
    CreateContact,
    /// Update a contact.
    UpdateContact,
    /// Delete a contact.
    DeleteContact,
    /// List appointments.
    GetAppointments,
    /// Create an appointment.
    CreateAppointment,
    /// Update an appointment.
    UpdateAppointment,
    /// Delete an appointment.
    DeleteAppointment,
    /// List invoices.
    GetInvoices,
    /// Create an invoice.
    CreateInvoice,
    /// Update an invoice.
    UpdateInvoice,
    /// Delete an invoice.
    DeleteInvoice,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetTasks => "get_tasks",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::GetLeads => "get_leads",
            Self::CreateLead => "create_lead",
            Self::UpdateLead => "update_lead",
            Self::DeleteLead => "delete_lead",
            Self::GetContacts => "get_contacts",
            Self::CreateContact => "create_contact",
            Self::UpdateContact => "update_contact",
            Self::DeleteContact => "delete_contact",
            Self::GetAppointments => "get_appointments",
            Self::CreateAppointment => "create_appointment",
            Self::UpdateAppointment => "update_appointment",
            Self::DeleteAppointment => "delete_appointment",
            Self::GetInvoices => "get_invoices",
            Self::CreateInvoice => "create_invoice",
            Self::UpdateInvoice => "update_invoice",
            Self::DeleteInvoice => "delete_invoice",
        }
    }

    /// Returns all CRM Gate tool names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::GetTasks,
            Self::CreateTask,
            Self::UpdateTask,
            Self::DeleteTask,
            Self::GetLeads,
            Self::CreateLead,
            Self::UpdateLead,
            Self::DeleteLead,
            Self::GetContacts,
            Self::CreateContact,
            Self::UpdateContact,
            Self::DeleteContact,
            Self::GetAppointments,
            Self::CreateAppointment,
            Self::UpdateAppointment,
            Self::DeleteAppointment,
            Self::GetInvoices,
            Self::CreateInvoice,
            Self::UpdateInvoice,
            Self::DeleteInvoice,
        ]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Returns the resource domain the tool operates on.
    #[must_use]
    pub const fn domain(self) -> ResourceDomain {
        match self {
            Self::GetTasks | Self::CreateTask | Self::UpdateTask | Self::DeleteTask => {
                ResourceDomain::Tasks
            }
            Self::GetLeads | Self::CreateLead | Self::UpdateLead | Self::DeleteLead => {
                ResourceDomain::Leads
            }
            Self::GetContacts | Self::CreateContact | Self::UpdateContact | Self::DeleteContact => {
                ResourceDomain::Contacts
            }
            Self::GetAppointments
            | Self::CreateAppointment
            | Self::UpdateAppointment
            | Self::DeleteAppointment => ResourceDomain::Appointments,
            Self::GetInvoices | Self::CreateInvoice | Self::UpdateInvoice | Self::DeleteInvoice => {
                ResourceDomain::Invoices
            }
        }
    }

    /// Returns the CRUD operation the tool performs.
    #[must_use]
    pub const fn operation(self) -> ToolOperation {
        match self {
            Self::GetTasks
            | Self::GetLeads
            | Self::GetContacts
            | Self::GetAppointments
            | Self::GetInvoices => ToolOperation::Get,
            Self::CreateTask
            | Self::CreateLead
            | Self::CreateContact
            | Self::CreateAppointment
            | Self::CreateInvoice => ToolOperation::Create,
            Self::UpdateTask
            | Self::UpdateLead
            | Self::UpdateContact
            | Self::UpdateAppointment
            | Self::UpdateInvoice => ToolOperation::Update,
            Self::DeleteTask
            | Self::DeleteLead
            | Self::DeleteContact
            | Self::DeleteAppointment
            | Self::DeleteInvoice => ToolOperation::Delete,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
