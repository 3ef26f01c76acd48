// crm-gate-mcp/src/schema.rs
// ============================================================================
// Module: Resource Schemas
// Description: Field tables and JSON Schema builders for CRM resource tools.
// Purpose: Derive every tool's argument schema from one field table per domain.
// Dependencies: crm-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Each resource domain is described once by a [`ResourceSchema`]: its fields,
//! which of them are required, enum values and defaults. The argument schemas
//! for the four CRUD tools are generated from that table so listing filters,
//! create payloads and update patches can never drift apart.
//!
//! Argument schemas describe the arguments a handler receives. The published
//! `inputSchema` adds the caller's `agent_id`; see [`with_agent_id`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crm_gate_core::ToolOperation;
use crm_gate_core::core::record::CREATED_AT_FIELD;
use crm_gate_core::core::record::ID_FIELD;
use crm_gate_core::core::record::UPDATED_AT_FIELD;
use crm_gate_core::tooling::ResourceDomain;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Argument key carrying the calling agent identifier.
pub const AGENT_ID_ARG: &str = "agent_id";
/// Argument key selecting the sort field for list tools.
pub const ORDER_BY_ARG: &str = "order_by";
/// Argument key selecting the sort direction for list tools.
pub const ORDER_ARG: &str = "order";
/// Argument key bounding the page size for list tools.
pub const LIMIT_ARG: &str = "limit";
/// Argument key skipping leading matches for list tools.
pub const OFFSET_ARG: &str = "offset";
/// Suffix for inclusive lower-bound date filters.
pub const RANGE_FROM_SUFFIX: &str = "_from";
/// Suffix for inclusive upper-bound date filters.
pub const RANGE_TO_SUFFIX: &str = "_to";
/// Maximum page size accepted by list tools.
pub const MAX_LIST_LIMIT: u64 = 1_000;

// ============================================================================
// SECTION: Field Table
// ============================================================================

/// Value shape of a resource field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form string.
    Text,
    /// JSON number.
    Number,
    /// ISO 8601 date or date-time string; supports range filters.
    Date,
    /// Closed set of string values with a default applied on create.
    Enum {
        /// Allowed values.
        values: &'static [&'static str],
        /// Value stored when a create call omits the field.
        default: &'static str,
    },
}

/// Single field of a resource domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as stored and filtered.
    pub name: &'static str,
    /// Value shape.
    pub kind: FieldKind,
    /// Whether create calls must supply the field.
    pub required: bool,
    /// Human-readable description published in schemas.
    pub description: &'static str,
}

impl FieldSpec {
    /// Declares an optional text field.
    #[must_use]
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: false,
            description,
        }
    }

    /// Declares an optional numeric field.
    #[must_use]
    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
            required: false,
            description,
        }
    }

    /// Declares an optional date field.
    #[must_use]
    pub const fn date(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Date,
            required: false,
            description,
        }
    }

    /// Declares an enum field with a create-time default.
    #[must_use]
    pub const fn choice(
        name: &'static str,
        description: &'static str,
        values: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Enum {
                values,
                default,
            },
            required: false,
            description,
        }
    }

    /// Marks the field as required on create.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the default value applied on create, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        match self.kind {
            FieldKind::Enum {
                default, ..
            } => Some(Value::String(default.to_string())),
            _ => None,
        }
    }

    /// Returns the JSON Schema for a non-null value of this field.
    fn value_schema(&self) -> Value {
        let mut schema = match self.kind {
            FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Number => json!({ "type": "number" }),
            FieldKind::Date => json!({
                "type": "string",
                "minLength": 1
            }),
            FieldKind::Enum {
                values, ..
            } => json!({ "type": "string", "enum": values }),
        };
        if self.required && self.kind == FieldKind::Text {
            schema["minLength"] = json!(1);
        }
        schema["description"] = Value::String(self.description.to_string());
        schema
    }

    /// Returns the JSON Schema for this field when null is also accepted.
    fn nullable_schema(&self) -> Value {
        let mut schema = self.value_schema();
        if let Some(kind) = schema.get("type").cloned() {
            schema["type"] = json!([kind, "null"]);
        }
        if let Some(Value::Array(values)) = schema.get_mut("enum") {
            values.push(Value::Null);
        }
        schema
    }
}

/// Descriptions published for a domain's four tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptions {
    /// List tool description.
    pub get: &'static str,
    /// Create tool description.
    pub create: &'static str,
    /// Update tool description.
    pub update: &'static str,
    /// Delete tool description.
    pub delete: &'static str,
}

/// Field table and tool metadata for one resource domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Resource domain served by the tools.
    pub domain: ResourceDomain,
    /// Singular noun used in messages (`task`, `lead`).
    pub singular: &'static str,
    /// Domain fields in publication order.
    pub fields: &'static [FieldSpec],
    /// Tool descriptions.
    pub descriptions: ToolDescriptions,
}

// ============================================================================
// SECTION: Schema Builders
// ============================================================================

impl ResourceSchema {
    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns the field that a `<field>_from` / `<field>_to` key filters.
    #[must_use]
    pub fn range_field(&self, key: &str) -> Option<&FieldSpec> {
        let base = key
            .strip_suffix(RANGE_FROM_SUFFIX)
            .or_else(|| key.strip_suffix(RANGE_TO_SUFFIX))?;
        self.field(base).filter(|field| field.kind == FieldKind::Date)
    }

    /// Returns the names accepted by `order_by`.
    #[must_use]
    pub fn sortable_fields(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.fields.iter().map(|field| field.name).collect();
        names.push(CREATED_AT_FIELD);
        names.push(UPDATED_AT_FIELD);
        names
    }

    /// Returns the published description for an operation.
    #[must_use]
    pub const fn description(&self, operation: ToolOperation) -> &'static str {
        match operation {
            ToolOperation::Get => self.descriptions.get,
            ToolOperation::Create => self.descriptions.create,
            ToolOperation::Update => self.descriptions.update,
            ToolOperation::Delete => self.descriptions.delete,
        }
    }

    /// Builds the argument schema for an operation.
    #[must_use]
    pub fn arguments_schema(&self, operation: ToolOperation) -> Value {
        match operation {
            ToolOperation::Get => self.list_schema(),
            ToolOperation::Create => self.create_schema(),
            ToolOperation::Update => self.update_schema(),
            ToolOperation::Delete => self.delete_schema(),
        }
    }

    /// List arguments: equality filters, date ranges, ordering, paging.
    fn list_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(ID_FIELD.to_string(), id_schema(self.singular));
        for field in self.fields {
            properties.insert(field.name.to_string(), field.value_schema());
            if field.kind == FieldKind::Date {
                properties.insert(
                    format!("{}{RANGE_FROM_SUFFIX}", field.name),
                    json!({
                        "type": "string",
                        "description": format!("Inclusive lower bound on {}.", field.name)
                    }),
                );
                properties.insert(
                    format!("{}{RANGE_TO_SUFFIX}", field.name),
                    json!({
                        "type": "string",
                        "description": format!("Inclusive upper bound on {}.", field.name)
                    }),
                );
            }
        }
        properties.insert(
            ORDER_BY_ARG.to_string(),
            json!({
                "type": "string",
                "enum": self.sortable_fields(),
                "description": "Field to order by. Defaults to creation time."
            }),
        );
        properties.insert(
            ORDER_ARG.to_string(),
            json!({
                "type": "string",
                "enum": ["asc", "desc"],
                "description": "Sort direction. Defaults to desc."
            }),
        );
        properties.insert(
            LIMIT_ARG.to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_LIST_LIMIT,
                "description": "Maximum number of records returned. Defaults to 50."
            }),
        );
        properties.insert(
            OFFSET_ARG.to_string(),
            json!({
                "type": "integer",
                "minimum": 0,
                "description": "Number of matching records to skip."
            }),
        );
        object_schema(properties, Vec::new())
    }

    /// Create arguments: domain fields with required ones enforced.
    fn create_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in self.fields {
            if field.required {
                required.push(field.name);
                properties.insert(field.name.to_string(), field.value_schema());
            } else {
                properties.insert(field.name.to_string(), field.nullable_schema());
            }
        }
        object_schema(properties, required)
    }

    /// Update arguments: the record id plus at least one field.
    fn update_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(ID_FIELD.to_string(), id_schema(self.singular));
        for field in self.fields {
            let schema = if field.required {
                field.value_schema()
            } else {
                field.nullable_schema()
            };
            properties.insert(field.name.to_string(), schema);
        }
        let mut schema = object_schema(properties, vec![ID_FIELD]);
        schema["minProperties"] = json!(2);
        schema
    }

    /// Delete arguments: the record id.
    fn delete_schema(&self) -> Value {
        let mut properties = Map::new();
        properties.insert(ID_FIELD.to_string(), id_schema(self.singular));
        object_schema(properties, vec![ID_FIELD])
    }
}

/// Adds the required `agent_id` property to an argument schema.
///
/// The result is the `inputSchema` published through `tools/list`.
#[must_use]
pub fn with_agent_id(arguments_schema: &Value) -> Value {
    let mut schema = arguments_schema.clone();
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert(
            AGENT_ID_ARG.to_string(),
            json!({
                "type": "string",
                "minLength": 1,
                "description": "Identifier of the calling agent."
            }),
        );
    }
    match schema.get_mut("required") {
        Some(Value::Array(required)) => {
            required.insert(0, Value::String(AGENT_ID_ARG.to_string()));
        }
        _ => {
            schema["required"] = json!([AGENT_ID_ARG]);
        }
    }
    if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
        schema["minProperties"] = json!(min + 1);
    }
    schema
}

/// Builds a closed object schema.
fn object_schema(properties: Map<String, Value>, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Schema for a record id argument.
fn id_schema(singular: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": format!("Identifier of the {singular}.")
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
