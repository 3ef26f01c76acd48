// crm-gate-mcp/src/handlers.rs
// ============================================================================
// Module: Tool Handlers
// Description: Handler contract and the generic CRUD handler for CRM records.
// Purpose: Execute validated tool arguments against the record store.
// Dependencies: crm-gate-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ToolHandler`] receives arguments that already passed schema validation
//! and an [`AgentContext`] identifying the caller. Handlers never check
//! permissions and never write audit records; the dispatcher owns both.
//! Each call returns the client payload together with a compact summary that
//! the dispatcher stores as audit context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crm_gate_core::AgentId;
use crm_gate_core::FieldFilter;
use crm_gate_core::FilterOp;
use crm_gate_core::RecordId;
use crm_gate_core::RecordQuery;
use crm_gate_core::RecordStore;
use crm_gate_core::SortKey;
use crm_gate_core::SortOrder;
use crm_gate_core::StoreError;
use crm_gate_core::ToolOperation;
use crm_gate_core::core::record::CREATED_AT_FIELD;
use crm_gate_core::core::record::ID_FIELD;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::schema::LIMIT_ARG;
use crate::schema::OFFSET_ARG;
use crate::schema::ORDER_ARG;
use crate::schema::ORDER_BY_ARG;
use crate::schema::RANGE_FROM_SUFFIX;
use crate::schema::ResourceSchema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field stamped on created records with the creating agent's id.
pub const CREATED_BY_FIELD: &str = "created_by_agent";

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// Caller identity passed to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentContext {
    /// Validated, active agent identifier.
    pub agent_id: AgentId,
    /// Transport correlation identifier, when present.
    pub request_id: Option<String>,
}

/// Successful handler result.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    /// Payload returned to the client.
    pub payload: Value,
    /// Bounded summary recorded as audit context.
    pub summary: Value,
}

/// Typed handler failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFailure {
    /// Arguments were rejected.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// The record store failed. The detail is internal.
    #[error("record store operation failed: {0}")]
    Store(String),
}

impl From<StoreError> for HandlerFailure {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Invalid(message) => Self::InvalidArguments(message),
            other => Self::Store(other.to_string()),
        }
    }
}

/// Executes one tool against a backend.
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with schema-validated arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailure`] when the arguments are unusable, the record
    /// is missing, or the store fails.
    fn call(&self, arguments: Value, context: &AgentContext)
    -> Result<HandlerOutput, HandlerFailure>;
}

// ============================================================================
// SECTION: Record Handler
// ============================================================================

/// Generic CRUD handler for one resource domain and operation.
pub struct RecordToolHandler {
    /// Field table for the domain.
    schema: &'static ResourceSchema,
    /// Operation performed.
    operation: ToolOperation,
    /// Backing record store.
    store: Arc<dyn RecordStore>,
}

impl RecordToolHandler {
    /// Creates a handler for `operation` on the schema's domain.
    #[must_use]
    pub fn new(
        schema: &'static ResourceSchema,
        operation: ToolOperation,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            schema,
            operation,
            store,
        }
    }

    /// Lists records matching the filter arguments.
    fn list(&self, arguments: &Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let query = build_query(self.schema, arguments)?;
        let records = self.store.query(self.schema.domain, &query)?;
        let count = records.len();
        let filters: Map<String, Value> = arguments
            .iter()
            .filter(|(key, _)| !is_paging_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let records: Vec<Value> = records.iter().map(|record| record.to_json()).collect();
        Ok(HandlerOutput {
            payload: json!({
                "domain": self.schema.domain.as_str(),
                "count": count,
                "records": records,
            }),
            summary: json!({
                "count": count,
                "filters": filters,
                "limit": query.limit,
                "offset": query.offset,
            }),
        })
    }

    /// Creates a record, applying enum defaults and stamping the creator.
    fn create(
        &self,
        arguments: Map<String, Value>,
        context: &AgentContext,
    ) -> Result<HandlerOutput, HandlerFailure> {
        let mut fields: Map<String, Value> =
            arguments.into_iter().filter(|(_, value)| !value.is_null()).collect();
        for field in self.schema.fields {
            if !fields.contains_key(field.name)
                && let Some(default) = field.default_value()
            {
                fields.insert(field.name.to_string(), default);
            }
        }
        fields.insert(
            CREATED_BY_FIELD.to_string(),
            Value::String(context.agent_id.as_str().to_string()),
        );
        let record = self.store.insert(self.schema.domain, fields)?;
        Ok(HandlerOutput {
            payload: json!({ "record": record.to_json() }),
            summary: json!({ "record_id": record.id.as_str() }),
        })
    }

    /// Applies a field patch to an existing record.
    fn update(&self, mut arguments: Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let id = take_record_id(&mut arguments)?;
        if arguments.is_empty() {
            return Err(HandlerFailure::InvalidArguments(
                "update requires at least one field".to_string(),
            ));
        }
        let updated_fields: Vec<String> = arguments.keys().cloned().collect();
        let record = self
            .store
            .update(self.schema.domain, &id, arguments)?
            .ok_or_else(|| self.not_found(&id))?;
        Ok(HandlerOutput {
            payload: json!({ "record": record.to_json() }),
            summary: json!({
                "record_id": id.as_str(),
                "fields": updated_fields,
            }),
        })
    }

    /// Deletes a record by id.
    fn delete(&self, mut arguments: Map<String, Value>) -> Result<HandlerOutput, HandlerFailure> {
        let id = take_record_id(&mut arguments)?;
        if !self.store.delete(self.schema.domain, &id)? {
            return Err(self.not_found(&id));
        }
        Ok(HandlerOutput {
            payload: json!({ "deleted": true, "id": id.as_str() }),
            summary: json!({ "record_id": id.as_str() }),
        })
    }

    /// Builds the not-found failure for a record id.
    fn not_found(&self, id: &RecordId) -> HandlerFailure {
        HandlerFailure::NotFound(format!("{} {id}", self.schema.singular))
    }
}

impl ToolHandler for RecordToolHandler {
    fn call(
        &self,
        arguments: Value,
        context: &AgentContext,
    ) -> Result<HandlerOutput, HandlerFailure> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(HandlerFailure::InvalidArguments(
                    "arguments must be an object".to_string(),
                ));
            }
        };
        match self.operation {
            ToolOperation::Get => self.list(&arguments),
            ToolOperation::Create => self.create(arguments, context),
            ToolOperation::Update => self.update(arguments),
            ToolOperation::Delete => self.delete(arguments),
        }
    }
}

// ============================================================================
// SECTION: Query Translation
// ============================================================================

/// Translates list arguments into a record query.
///
/// # Errors
///
/// Returns [`HandlerFailure::InvalidArguments`] for keys or values the
/// domain does not support.
pub fn build_query(
    schema: &ResourceSchema,
    arguments: &Map<String, Value>,
) -> Result<RecordQuery, HandlerFailure> {
    let mut query = RecordQuery::default();
    let mut order_by: Option<String> = None;
    let mut order: Option<SortOrder> = None;
    for (key, value) in arguments {
        match key.as_str() {
            LIMIT_ARG => query.limit = usize_arg(key, value)?,
            OFFSET_ARG => query.offset = usize_arg(key, value)?,
            ORDER_BY_ARG => {
                let field = value
                    .as_str()
                    .filter(|field| schema.sortable_fields().iter().any(|name| name == field));
                let Some(field) = field else {
                    return Err(HandlerFailure::InvalidArguments(format!(
                        "unsupported order_by for {}",
                        schema.domain
                    )));
                };
                order_by = Some(field.to_string());
            }
            ORDER_ARG => {
                let parsed = value.as_str().and_then(SortOrder::parse);
                let Some(parsed) = parsed else {
                    return Err(HandlerFailure::InvalidArguments(
                        "order must be asc or desc".to_string(),
                    ));
                };
                order = Some(parsed);
            }
            ID_FIELD => query.filters.push(FieldFilter::eq(ID_FIELD, value.clone())),
            _ => {
                if schema.field(key).is_some() {
                    query.filters.push(FieldFilter::eq(key.clone(), value.clone()));
                } else if let Some(field) = schema.range_field(key) {
                    let op = if key.ends_with(RANGE_FROM_SUFFIX) {
                        FilterOp::Gte
                    } else {
                        FilterOp::Lte
                    };
                    query.filters.push(FieldFilter {
                        field: field.name.to_string(),
                        op,
                        value: value.clone(),
                    });
                } else {
                    return Err(HandlerFailure::InvalidArguments(format!(
                        "unknown argument: {key}"
                    )));
                }
            }
        }
    }
    query.sort = match (order_by, order) {
        (Some(field), order) => Some(SortKey {
            field,
            order: order.unwrap_or_default(),
        }),
        (None, Some(order)) => Some(SortKey {
            field: CREATED_AT_FIELD.to_string(),
            order,
        }),
        (None, None) => None,
    };
    Ok(query)
}

/// Returns true for list keys that shape the page rather than filter it.
fn is_paging_key(key: &str) -> bool {
    matches!(key, LIMIT_ARG | OFFSET_ARG | ORDER_ARG | ORDER_BY_ARG)
}

/// Reads a non-negative integer argument.
fn usize_arg(key: &str, value: &Value) -> Result<usize, HandlerFailure> {
    value
        .as_u64()
        .and_then(|number| usize::try_from(number).ok())
        .ok_or_else(|| {
            HandlerFailure::InvalidArguments(format!("{key} must be a non-negative integer"))
        })
}

/// Removes and returns the `id` argument.
fn take_record_id(arguments: &mut Map<String, Value>) -> Result<RecordId, HandlerFailure> {
    match arguments.remove(ID_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(RecordId::new(id)),
        _ => Err(HandlerFailure::InvalidArguments("id is required".to_string())),
    }
}
