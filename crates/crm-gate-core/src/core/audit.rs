// crm-gate-core/src/core/audit.rs
// ============================================================================
// Module: Dispatch Records
// Description: Append-only audit entries for tool dispatch attempts.
// Purpose: Capture who invoked which tool, in which domain, and how it ended.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`DispatchRecord`] is written for every dispatch attempt that resolves
//! to a registered tool. The `context` carries a compact summary (filters,
//! affected record id, result count, request id) and never a full payload.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentId;
use crate::core::time::Timestamp;

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Handler completed successfully.
    Success,
    /// Permission check rejected the call.
    Denied,
    /// Agent validation, argument validation, or handler execution failed.
    Error,
}

impl DispatchOutcome {
    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Error => "error",
        }
    }

    /// Parses an outcome label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "success" => Some(Self::Success),
            "denied" => Some(Self::Denied),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Audit entry for a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Agent identifier as supplied by the caller (may be unknown).
    pub agent_id: AgentId,
    /// Resource domain of the tool.
    pub domain: String,
    /// Tool name.
    pub tool: String,
    /// Dispatch outcome.
    pub outcome: DispatchOutcome,
    /// Error detail for denied or failed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured summary of the call.
    #[serde(default)]
    pub context: Value,
    /// Correlation identifier from the transport, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Time the record was produced.
    pub recorded_at: Timestamp,
}
