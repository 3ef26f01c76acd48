// crm-gate-core/src/core/agent.rs
// ============================================================================
// Module: Agents
// Description: Agent identity and activation status.
// Purpose: Describe the caller the dispatcher validates before any tool runs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Agents are created by an administrator and only read by the dispatcher.
//! An inactive agent is treated the same as an unknown one.

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AgentId;

/// Activation status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent may invoke tools (subject to permissions).
    #[default]
    Active,
    /// Agent is disabled; every dispatch fails agent validation.
    Inactive,
}

impl AgentStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parses a status label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Identity invoking tool operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier.
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Activation status.
    #[serde(default)]
    pub status: AgentStatus,
}

impl Agent {
    /// Builds an active agent.
    #[must_use]
    pub fn active(agent_id: impl Into<AgentId>, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            status: AgentStatus::Active,
        }
    }

    /// Returns true when the agent may invoke tools.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, AgentStatus::Active)
    }
}
