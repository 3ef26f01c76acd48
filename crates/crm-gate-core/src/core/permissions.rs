// crm-gate-core/src/core/permissions.rs
// ============================================================================
// Module: Permission Maps
// Description: Per-agent map from resource domain to enabled tool names.
// Purpose: Evaluate whether an agent may invoke a tool in a domain.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A permission map is keyed by resource-domain name. A tool may run only when
//! the domain entry exists, is explicitly enabled, and lists the tool name.
//! Every other shape denies: missing entries, `enabled` absent or false, an
//! empty tool list. Unknown domain keys are retained but never consulted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Grant for one resource domain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainGrant {
    /// Master switch for the domain. Absent means disabled.
    #[serde(default)]
    pub enabled: bool,
    /// Tool names enabled within the domain.
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

impl DomainGrant {
    /// Builds an enabled grant for the given tool names.
    #[must_use]
    pub fn enabled<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-agent permission map keyed by resource-domain name.
///
/// # Invariants
/// - [`PermissionMap::is_enabled`] is true only for `enabled == true` and a
///   listed tool name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, DomainGrant>);

impl PermissionMap {
    /// Returns an empty map that denies every tool.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a permission map from JSON, failing on malformed input.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the value is not a map of grants.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Inserts or replaces the grant for a domain.
    pub fn set_domain(&mut self, domain: impl Into<String>, grant: DomainGrant) {
        self.0.insert(domain.into(), grant);
    }

    /// Returns a builder-style copy with the domain grant set.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>, grant: DomainGrant) -> Self {
        self.set_domain(domain, grant);
        self
    }

    /// Returns the grant for a domain, if present.
    #[must_use]
    pub fn grant(&self, domain: &str) -> Option<&DomainGrant> {
        self.0.get(domain)
    }

    /// Iterates over domain grants in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DomainGrant)> {
        self.0.iter()
    }

    /// Returns true when the map has no domain entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when `tool` may run within `domain`.
    #[must_use]
    pub fn is_enabled(&self, domain: &str, tool: &str) -> bool {
        self.0.get(domain).is_some_and(|grant| grant.enabled && grant.tools.contains(tool))
    }
}
