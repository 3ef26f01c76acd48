// crm-gate-config/src/config.rs
// ============================================================================
// Module: CRM Gate Configuration
// Description: Configuration loading and validation for CRM Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: crm-gate-core, crm-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: an unknown tool name in a
//! seed permission map, a file sink without a path, or an HTTP transport
//! without a bind address all reject the whole file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use crm_gate_core::Agent;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::PermissionMap;
use crm_gate_core::ResourceDomain;
use crm_gate_core::ToolName;
use crm_gate_store_sqlite::SqliteStoreConfig;
use crm_gate_store_sqlite::SqliteStoreMode;
use crm_gate_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "crm-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CRM_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard ceiling for the request body size in bytes.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum number of seed agents.
pub(crate) const MAX_SEED_AGENTS: usize = 256;
/// Maximum length of an agent identifier.
pub const MAX_AGENT_ID_LENGTH: usize = 128;
/// Maximum length of an agent display name.
pub(crate) const MAX_AGENT_NAME_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// CRM Gate MCP configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrmGateConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Dispatch audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Operational event sink configuration.
    #[serde(default)]
    pub events: EventsConfig,
    /// Agents seeded into the store at startup.
    #[serde(default)]
    pub agents: Vec<AgentSeedConfig>,
}

impl CrmGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        self.events.validate()?;
        validate_agents(&self.agents)
    }
}

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport with Content-Length framing.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes exceeds limit of {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        match self.transport {
            ServerTransport::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http transport requires bind address".to_string(),
                    ));
                }
                bind.parse::<SocketAddr>()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
                Ok(())
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport must not set bind address".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the parsed bind address for the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .as_deref()
            .map(str::trim)
            .filter(|bind| !bind.is_empty())
            .ok_or_else(|| ConfigError::Invalid("http transport requires bind address".to_string()))?
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Record store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates record store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }

    /// Returns the `SQLite` store configuration when the sqlite backend is
    /// selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Destinations for dispatch audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Persist records in the configured record store.
    #[default]
    Store,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
    /// Discard records.
    None,
}

/// Dispatch audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// JSON lines path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_sink_path("audit", self.sink == AuditSinkKind::File, self.path.as_deref())
    }
}

/// Destinations for operational events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Write JSON lines to stderr.
    #[default]
    Stderr,
    /// Append JSON lines to a file.
    File,
    /// Discard events.
    None,
}

/// Operational event sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// JSON lines path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl EventsConfig {
    /// Validates event sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_sink_path("events", self.sink == EventSinkKind::File, self.path.as_deref())
    }
}

/// Agent seeded into the store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSeedConfig {
    /// Agent identifier.
    pub agent_id: String,
    /// Display name.
    pub name: String,
    /// Activation status.
    #[serde(default)]
    pub status: AgentStatus,
    /// Permission map applied to the agent.
    #[serde(default)]
    pub permissions: PermissionMap,
}

impl AgentSeedConfig {
    /// Returns the agent record for this seed.
    #[must_use]
    pub fn to_agent(&self) -> Agent {
        Agent {
            agent_id: AgentId::new(self.agent_id.trim()),
            name: self.name.clone(),
            status: self.status,
        }
    }

    /// Validates a single seed entry.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_id(&self.agent_id)?;
        if self.name.trim().is_empty() || self.name.len() > MAX_AGENT_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "agent {} name must be 1..={MAX_AGENT_NAME_LENGTH} characters",
                self.agent_id
            )));
        }
        validate_permission_map(&self.agent_id, &self.permissions)
    }
}

/// Returns the default max body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an agent identifier.
///
/// # Errors
///
/// Returns [`ConfigError`] when the identifier is blank, too long, or carries
/// surrounding whitespace.
pub fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    if agent_id.trim().is_empty() {
        return Err(ConfigError::Invalid("agent_id must be non-empty".to_string()));
    }
    if agent_id.trim() != agent_id {
        return Err(ConfigError::Invalid(format!(
            "agent_id '{agent_id}' must not have surrounding whitespace"
        )));
    }
    if agent_id.len() > MAX_AGENT_ID_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "agent_id exceeds max length of {MAX_AGENT_ID_LENGTH}"
        )));
    }
    Ok(())
}

/// Validates that every permission entry names a known domain and tools
/// belonging to it.
///
/// # Errors
///
/// Returns [`ConfigError`] for unknown domains, unknown tools, or tools
/// listed under the wrong domain.
pub fn validate_permission_map(owner: &str, map: &PermissionMap) -> Result<(), ConfigError> {
    for (domain_key, grant) in map.iter() {
        let domain = ResourceDomain::parse(domain_key).ok_or_else(|| {
            ConfigError::Invalid(format!("agent {owner} permissions: unknown domain {domain_key}"))
        })?;
        for tool_name in &grant.tools {
            let tool = ToolName::parse(tool_name).ok_or_else(|| {
                ConfigError::Invalid(format!("agent {owner} permissions: unknown tool {tool_name}"))
            })?;
            if tool.domain() != domain {
                return Err(ConfigError::Invalid(format!(
                    "agent {owner} permissions: tool {tool_name} does not belong to {domain_key}"
                )));
            }
        }
    }
    Ok(())
}

/// Validates seed agents for limits and uniqueness.
fn validate_agents(agents: &[AgentSeedConfig]) -> Result<(), ConfigError> {
    if agents.len() > MAX_SEED_AGENTS {
        return Err(ConfigError::Invalid(format!(
            "too many seed agents (max {MAX_SEED_AGENTS})"
        )));
    }
    let mut seen = BTreeSet::new();
    for agent in agents {
        agent.validate()?;
        if !seen.insert(agent.agent_id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate agent_id {}", agent.agent_id)));
        }
    }
    Ok(())
}

/// Validates that a file sink has a path and other sinks do not.
fn validate_sink_path(
    section: &str,
    is_file: bool,
    path: Option<&str>,
) -> Result<(), ConfigError> {
    match (is_file, path) {
        (true, Some(path)) => validate_path_string(&format!("{section}.path"), path),
        (true, None) => Err(ConfigError::Invalid(format!("{section} file sink requires path"))),
        (false, Some(_)) => {
            Err(ConfigError::Invalid(format!("{section}.path is only valid for the file sink")))
        }
        (false, None) => Ok(()),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
