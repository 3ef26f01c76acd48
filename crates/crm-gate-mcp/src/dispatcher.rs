// crm-gate-mcp/src/dispatcher.rs
// ============================================================================
// Module: Tool Dispatcher
// Description: Permission-gated execution of registered CRM tools.
// Purpose: Enforce check-then-execute-then-log for every tool call.
// Dependencies: crate::{audit, handlers, registry}, crm-gate-core
// ============================================================================

//! ## Overview
//! [`ToolDispatcher::dispatch`] is the only path from a tool call to a
//! handler. The sequence is fixed:
//! 1. Resolve the tool. Unknown names fail without an audit record or a
//!    permission lookup; a diagnostic event is emitted instead.
//! 2. Validate that the agent id is present, known, and active.
//! 3. Load the agent's permission map and check `domain.enabled` and the tool
//!    list. Lookup failures deny.
//! 4. Validate arguments, then run the handler.
//! 5. Write exactly one audit record for the attempt and return.
//!
//! The dispatcher holds no mutable state; each call re-reads the agent and
//! its permissions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::DispatchOutcome;
use crm_gate_core::DispatchRecord;
use crm_gate_core::PermissionMap;
use crm_gate_core::PermissionStore;
use crm_gate_core::Timestamp;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditLogger;
use crate::audit::DiagnosticEvent;
use crate::audit::McpEventSink;
use crate::handlers::AgentContext;
use crate::handlers::HandlerFailure;
use crate::registry::RegisteredTool;
use crate::registry::ToolRegistry;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Tool call as received from the protocol adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Wire tool name.
    pub tool: String,
    /// Tool arguments without `agent_id`.
    pub arguments: Value,
    /// Calling agent identifier, when supplied.
    pub agent_id: Option<String>,
    /// Transport correlation identifier, when present.
    pub request_id: Option<String>,
}

/// Dispatch failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The tool name is not in the catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The agent id is missing, unknown, or inactive.
    #[error("invalid agent: {0}")]
    InvalidAgent(String),
    /// The agent lacks permission for the tool.
    #[error("permission denied: {tool} is not enabled for agent {agent_id}")]
    PermissionDenied {
        /// Calling agent.
        agent_id: String,
        /// Denied tool.
        tool: String,
    },
    /// The handler rejected or failed the call.
    #[error(transparent)]
    HandlerError(#[from] HandlerFailure),
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Stateless permission-gated tool dispatcher.
#[derive(Clone)]
pub struct ToolDispatcher {
    /// Tool catalog.
    registry: Arc<ToolRegistry>,
    /// Agent lookup.
    agents: Arc<dyn AgentDirectory>,
    /// Permission map lookup.
    permissions: Arc<dyn PermissionStore>,
    /// Dispatch audit logger.
    audit: AuditLogger,
    /// Operational diagnostics.
    events: Arc<dyn McpEventSink>,
}

impl ToolDispatcher {
    /// Creates a dispatcher over its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        agents: Arc<dyn AgentDirectory>,
        permissions: Arc<dyn PermissionStore>,
        audit: AuditLogger,
        events: Arc<dyn McpEventSink>,
    ) -> Self {
        Self {
            registry,
            agents,
            permissions,
            audit,
            events,
        }
    }

    /// Returns the tool catalog.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatches one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the tool is unknown, the agent is
    /// invalid, permission is denied, or the handler fails.
    pub fn dispatch(&self, request: DispatchRequest) -> Result<Value, DispatchError> {
        let DispatchRequest {
            tool,
            arguments,
            agent_id,
            request_id,
        } = request;

        let Some(registered) = self.registry.resolve(&tool) else {
            self.events.record_diagnostic(
                &DiagnosticEvent::new("unknown_tool", format!("unknown tool: {tool}")).with_call(
                    tool.clone(),
                    agent_id,
                    request_id,
                ),
            );
            return Err(DispatchError::UnknownTool(tool));
        };

        let attempt = Attempt {
            registered,
            agent_id: AgentId::new(agent_id.unwrap_or_default()),
            request_id,
        };

        if let Err(message) = self.check_agent(&attempt) {
            let error = DispatchError::InvalidAgent(message);
            attempt.log(&self.audit, DispatchOutcome::Error, Some(error.to_string()), Value::Null);
            return Err(error);
        }

        let permissions = self.load_permissions(&attempt);
        if !permissions.is_enabled(registered.domain().as_str(), registered.tool().as_str()) {
            let error = DispatchError::PermissionDenied {
                agent_id: attempt.agent_id.to_string(),
                tool: registered.tool().as_str().to_string(),
            };
            attempt.log(&self.audit, DispatchOutcome::Denied, Some(error.to_string()), Value::Null);
            return Err(error);
        }

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        if let Err(message) = registered.validate_arguments(&arguments) {
            let failure = HandlerFailure::InvalidArguments(message);
            attempt.log(&self.audit, DispatchOutcome::Error, Some(failure.to_string()), Value::Null);
            return Err(failure.into());
        }

        let context = AgentContext {
            agent_id: attempt.agent_id.clone(),
            request_id: attempt.request_id.clone(),
        };
        match registered.handler().call(arguments, &context) {
            Ok(output) => {
                attempt.log(&self.audit, DispatchOutcome::Success, None, output.summary);
                Ok(output.payload)
            }
            Err(failure) => {
                attempt.log(&self.audit, DispatchOutcome::Error, Some(failure.to_string()), Value::Null);
                Err(failure.into())
            }
        }
    }

    /// Confirms the caller is a known, active agent.
    fn check_agent(&self, attempt: &Attempt<'_>) -> Result<(), String> {
        if attempt.agent_id.is_blank() {
            return Err("agent_id is required".to_string());
        }
        match self.agents.agent(&attempt.agent_id) {
            Ok(Some(agent)) if agent.is_active() => Ok(()),
            Ok(Some(_)) => Err(format!("agent {} is inactive", attempt.agent_id)),
            Ok(None) => Err(format!("agent {} is not registered", attempt.agent_id)),
            Err(err) => {
                self.diagnose(attempt, "agent_lookup_failed", err.to_string());
                Err(format!("agent {} could not be verified", attempt.agent_id))
            }
        }
    }

    /// Loads the caller's permission map. Missing or failed lookups deny.
    fn load_permissions(&self, attempt: &Attempt<'_>) -> PermissionMap {
        match self.permissions.permissions(&attempt.agent_id) {
            Ok(Some(map)) => map,
            Ok(None) => PermissionMap::empty(),
            Err(err) => {
                self.diagnose(attempt, "permission_lookup_failed", err.to_string());
                PermissionMap::empty()
            }
        }
    }

    /// Emits a diagnostic tied to the current attempt.
    fn diagnose(&self, attempt: &Attempt<'_>, kind: &'static str, message: String) {
        self.events.record_diagnostic(&DiagnosticEvent::new(kind, message).with_call(
            attempt.registered.tool().as_str(),
            Some(attempt.agent_id.to_string()),
            attempt.request_id.clone(),
        ));
    }
}

// ============================================================================
// SECTION: Attempt
// ============================================================================

/// Resolved call metadata shared by the audit writes of one attempt.
struct Attempt<'a> {
    /// Resolved tool.
    registered: &'a RegisteredTool,
    /// Caller as supplied; may be blank or unknown.
    agent_id: AgentId,
    /// Transport correlation identifier.
    request_id: Option<String>,
}

impl Attempt<'_> {
    /// Writes the attempt's single audit record.
    fn log(
        &self,
        audit: &AuditLogger,
        outcome: DispatchOutcome,
        error: Option<String>,
        summary: Value,
    ) {
        let mut context = match summary {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("summary".to_string(), other);
                map
            }
        };
        if let Some(request_id) = &self.request_id {
            context.insert("request_id".to_string(), Value::String(request_id.clone()));
        }
        audit.record(&DispatchRecord {
            agent_id: self.agent_id.clone(),
            domain: self.registered.domain().as_str().to_string(),
            tool: self.registered.tool().as_str().to_string(),
            outcome,
            error,
            context: Value::Object(context),
            request_id: self.request_id.clone(),
            recorded_at: Timestamp::now(),
        });
    }
}
