// crm-gate-mcp/src/registry.rs
// ============================================================================
// Module: Operation Registry
// Description: Enum-keyed catalog of tool handlers and compiled schemas.
// Purpose: Resolve tool names to handlers and publish the tool catalog.
// Dependencies: crm-gate-core, jsonschema, serde, thiserror
// ============================================================================

//! ## Overview
//! The registry is filled once at startup and is read-only afterwards. Every
//! [`ToolName`] must be registered exactly once; [`ToolRegistry::ensure_complete`]
//! turns a gap into a startup error. Argument schemas are compiled when a
//! tool is registered so an invalid schema can never reach request handling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crm_gate_core::ResourceDomain;
use crm_gate_core::ToolName;
use jsonschema::Draft;
use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::handlers::ToolHandler;
use crate::schema::with_agent_id;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The tool was registered more than once.
    #[error("tool registered twice: {0}")]
    Duplicate(ToolName),
    /// The argument schema did not compile.
    #[error("invalid argument schema for {tool}: {message}")]
    InvalidSchema {
        /// Tool whose schema failed.
        tool: ToolName,
        /// Compiler message.
        message: String,
    },
    /// Tools without a registered handler.
    #[error("tools missing handlers: {0}")]
    Missing(String),
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Tool entry published through `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: ToolName,
    /// Tool description.
    pub description: String,
    /// Published input schema, including `agent_id`.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Registered tool with its compiled argument validator.
pub struct RegisteredTool {
    /// Tool name.
    tool: ToolName,
    /// Tool description.
    description: String,
    /// Published input schema.
    input_schema: Value,
    /// Compiled argument validator.
    validator: Validator,
    /// Handler invoked after permission checks.
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    /// Returns the tool name.
    #[must_use]
    pub const fn tool(&self) -> ToolName {
        self.tool
    }

    /// Returns the tool's resource domain.
    #[must_use]
    pub const fn domain(&self) -> ResourceDomain {
        self.tool.domain()
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &dyn ToolHandler {
        self.handler.as_ref()
    }

    /// Validates handler arguments against the compiled schema.
    ///
    /// # Errors
    ///
    /// Returns the first validation message when the arguments are rejected.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), String> {
        if self.validator.is_valid(arguments) {
            return Ok(());
        }
        let message = self
            .validator
            .iter_errors(arguments)
            .next()
            .map_or_else(|| "schema validation failed".to_string(), |err| err.to_string());
        Err(message)
    }

    /// Returns the published definition.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool,
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool").field("tool", &self.tool).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Tool catalog keyed by [`ToolName`].
#[derive(Debug, Default)]
pub struct ToolRegistry {
    /// Registered tools.
    tools: BTreeMap<ToolName, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool handler and compiles its argument schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the tool is already registered or the
    /// schema does not compile.
    pub fn register(
        &mut self,
        tool: ToolName,
        description: impl Into<String>,
        arguments_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(&tool) {
            return Err(RegistryError::Duplicate(tool));
        }
        let validator = compile_schema(&arguments_schema).map_err(|message| {
            RegistryError::InvalidSchema {
                tool,
                message,
            }
        })?;
        let input_schema = with_agent_id(&arguments_schema);
        self.tools.insert(
            tool,
            RegisteredTool {
                tool,
                description: description.into(),
                input_schema,
                validator,
                handler,
            },
        );
        Ok(())
    }

    /// Resolves a wire tool name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        ToolName::parse(name).and_then(|tool| self.tools.get(&tool))
    }

    /// Returns the catalog in canonical tool order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::all()
            .iter()
            .filter_map(|tool| self.tools.get(tool))
            .map(RegisteredTool::definition)
            .collect()
    }

    /// Fails when any canonical tool lacks a handler.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Missing`] listing the unregistered tools.
    pub fn ensure_complete(&self) -> Result<(), RegistryError> {
        let missing: Vec<&str> = ToolName::all()
            .iter()
            .filter(|tool| !self.tools.contains_key(tool))
            .map(|tool| tool.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Missing(missing.join(", ")))
        }
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true when no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Compiles a draft 2020-12 argument schema.
fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| err.to_string())
}
