// crm-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite CRM Store
// Description: Durable CRM Gate collaborators backed by SQLite WAL.
// Purpose: Persist records, agents, permissions, and the dispatch audit trail.
// Dependencies: crm-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteCrmStore`] implements [`RecordStore`], [`AgentDirectory`],
//! [`PermissionStore`], [`AgentAdmin`], and [`DispatchAuditSink`] over one
//! mutex-guarded connection. Record bodies are JSON text; list queries push
//! filters, ordering, and pagination into SQL with bound parameters only.
//! Field names reach SQL exclusively as bound `json_extract` paths.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crm_gate_core::Agent;
use crm_gate_core::AgentAdmin;
use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::DispatchAuditSink;
use crm_gate_core::DispatchOutcome;
use crm_gate_core::DispatchRecord;
use crm_gate_core::FieldFilter;
use crm_gate_core::PermissionMap;
use crm_gate_core::PermissionStore;
use crm_gate_core::RecordId;
use crm_gate_core::RecordQuery;
use crm_gate_core::RecordStore;
use crm_gate_core::ResourceDomain;
use crm_gate_core::StoreError;
use crm_gate_core::StoredRecord;
use crm_gate_core::Timestamp;
use crm_gate_core::core::record::CREATED_AT_FIELD;
use crm_gate_core::core::record::ID_FIELD;
use crm_gate_core::core::record::UPDATED_AT_FIELD;
use crm_gate_core::runtime::apply_patch;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Columns selected for record rows.
const RECORD_COLUMNS: &str = "id, body, created_at, updated_at";

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` CRM store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config with default pragmas for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows fail to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed CRM store with WAL support.
#[derive(Clone)]
pub struct SqliteCrmStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCrmStore {
    /// Opens an `SQLite`-backed CRM store, creating the schema when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the full dispatch audit trail in append order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when rows cannot be read or decoded.
    pub fn dispatch_records(&self) -> Result<Vec<DispatchRecord>, SqliteStoreError> {
        self.read_dispatch_records(None)
    }

    /// Returns the most recent `limit` dispatch records in append order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when rows cannot be read or decoded.
    pub fn recent_dispatch_records(
        &self,
        limit: usize,
    ) -> Result<Vec<DispatchRecord>, SqliteStoreError> {
        self.read_dispatch_records(Some(limit))
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Reads dispatch records, newest `limit` when bounded.
    fn read_dispatch_records(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<DispatchRecord>, SqliteStoreError> {
        let limit = match limit {
            Some(value) => i64::try_from(value)
                .map_err(|_| SqliteStoreError::Invalid("audit limit too large".to_string()))?,
            None => -1,
        };
        let guard = self.lock()?;
        let mut statement = guard.prepare(
            "SELECT agent_id, domain, tool, outcome, error, context_json, request_id, \
             recorded_at FROM (SELECT * FROM dispatch_records ORDER BY seq DESC LIMIT ?1) \
             ORDER BY seq ASC",
        )?;
        let rows = statement.query_map(params![limit], |row| {
            Ok(DispatchRow {
                agent_id: row.get(0)?,
                domain: row.get(1)?,
                tool: row.get(2)?,
                outcome: row.get(3)?,
                error: row.get(4)?,
                context_json: row.get(5)?,
                request_id: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    /// Inserts a record row.
    fn insert_record(
        &self,
        domain: ResourceDomain,
        fields: Map<String, Value>,
    ) -> Result<StoredRecord, SqliteStoreError> {
        let now = Timestamp::now();
        let record = StoredRecord {
            id: RecordId::generate(),
            fields,
            created_at: now.clone(),
            updated_at: now,
        };
        let body = encode_body(&record.fields)?;
        let guard = self.lock()?;
        guard.execute(
            "INSERT INTO records (domain, id, body, created_at, updated_at) VALUES (?1, ?2, ?3, \
             ?4, ?5)",
            params![
                domain.as_str(),
                record.id.as_str(),
                body,
                record.created_at.as_str(),
                record.updated_at.as_str()
            ],
        )?;
        drop(guard);
        Ok(record)
    }

    /// Loads a record row by id.
    fn load_record(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE domain = ?1 AND id = ?2"),
                params![domain.as_str(), id.as_str()],
                RecordRow::from_row,
            )
            .optional()?;
        drop(guard);
        row.map(RecordRow::decode).transpose()
    }

    /// Runs a list query.
    fn query_records(
        &self,
        domain: ResourceDomain,
        query: &RecordQuery,
    ) -> Result<Vec<StoredRecord>, SqliteStoreError> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE domain = ?");
        let mut values = vec![SqlValue::Text(domain.as_str().to_string())];
        for filter in &query.filters {
            push_filter(&mut sql, &mut values, filter);
        }
        sql.push_str(" ORDER BY ");
        match &query.sort {
            // Creation order is insertion order.
            Some(sort) if sort.field == CREATED_AT_FIELD => {
                sql.push_str(&format!("seq {}", sort.order.sql_keyword()));
            }
            Some(sort) => {
                let expression = field_expression(&sort.field, &mut values);
                let second = field_expression(&sort.field, &mut values);
                sql.push_str(&format!(
                    "({expression} IS NULL) ASC, {second} {}, seq DESC",
                    sort.order.sql_keyword()
                ));
            }
            None => sql.push_str("seq DESC"),
        }
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(SqlValue::Integer(to_sql_int(query.limit)?));
        values.push(SqlValue::Integer(to_sql_int(query.offset)?));

        let guard = self.lock()?;
        let mut statement = guard.prepare(&sql)?;
        let rows = statement.query_map(params_from_iter(values.iter()), RecordRow::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    /// Applies a patch to a record row inside a transaction.
    fn update_record(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
        patch: Map<String, Value>,
    ) -> Result<Option<StoredRecord>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let row = tx
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE domain = ?1 AND id = ?2"),
                params![domain.as_str(), id.as_str()],
                RecordRow::from_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = row.decode()?;
        apply_patch(&mut record.fields, patch);
        record.updated_at = Timestamp::now();
        tx.execute(
            "UPDATE records SET body = ?1, updated_at = ?2 WHERE domain = ?3 AND id = ?4",
            params![
                encode_body(&record.fields)?,
                record.updated_at.as_str(),
                domain.as_str(),
                id.as_str()
            ],
        )?;
        tx.commit()?;
        drop(guard);
        Ok(Some(record))
    }

    /// Deletes a record row.
    fn delete_record(&self, domain: ResourceDomain, id: &RecordId) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let removed = guard.execute(
            "DELETE FROM records WHERE domain = ?1 AND id = ?2",
            params![domain.as_str(), id.as_str()],
        )?;
        drop(guard);
        Ok(removed > 0)
    }

    /// Loads an agent row.
    fn load_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT agent_id, name, status FROM agents WHERE agent_id = ?1",
                params![agent_id.as_str()],
                agent_row,
            )
            .optional()?;
        drop(guard);
        row.map(decode_agent).transpose()
    }

    /// Loads and parses a stored permission map.
    fn load_permissions(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<PermissionMap>, SqliteStoreError> {
        let guard = self.lock()?;
        let text: Option<String> = guard
            .query_row(
                "SELECT permissions_json FROM agent_permissions WHERE agent_id = ?1",
                params![agent_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        drop(guard);
        let Some(text) = text else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&text).map_err(|err| {
            SqliteStoreError::Corrupt(format!("permissions for {agent_id}: {err}"))
        })?;
        PermissionMap::from_json(&value)
            .map(Some)
            .map_err(|err| SqliteStoreError::Corrupt(format!("permissions for {agent_id}: {err}")))
    }

    /// Writes an agent row.
    fn write_agent(&self, agent: &Agent) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.execute(
            "INSERT INTO agents (agent_id, name, status) VALUES (?1, ?2, ?3) ON CONFLICT(agent_id) \
             DO UPDATE SET name = excluded.name, status = excluded.status",
            params![agent.agent_id.as_str(), agent.name, agent.status.as_str()],
        )?;
        drop(guard);
        Ok(())
    }

    /// Writes a permission map for an existing agent.
    fn write_permissions(
        &self,
        agent_id: &AgentId,
        map: &PermissionMap,
    ) -> Result<(), SqliteStoreError> {
        let text =
            serde_json::to_string(map).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let known: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM agents WHERE agent_id = ?1",
                params![agent_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Err(SqliteStoreError::Invalid(format!("unknown agent: {agent_id}")));
        }
        tx.execute(
            "INSERT INTO agent_permissions (agent_id, permissions_json) VALUES (?1, ?2) ON \
             CONFLICT(agent_id) DO UPDATE SET permissions_json = excluded.permissions_json",
            params![agent_id.as_str(), text],
        )?;
        tx.commit()?;
        drop(guard);
        Ok(())
    }

    /// Lists agent rows.
    fn read_agents(&self) -> Result<Vec<Agent>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement =
            guard.prepare("SELECT agent_id, name, status FROM agents ORDER BY agent_id")?;
        let rows = statement.query_map([], agent_row)?;
        let mut agents = Vec::new();
        for row in rows {
            agents.push(decode_agent(row?)?);
        }
        Ok(agents)
    }

    /// Appends a dispatch record row.
    fn write_dispatch_record(&self, record: &DispatchRecord) -> Result<(), SqliteStoreError> {
        let context = serde_json::to_string(&record.context)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.lock()?;
        guard.execute(
            "INSERT INTO dispatch_records (agent_id, domain, tool, outcome, error, context_json, \
             request_id, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.agent_id.as_str(),
                record.domain,
                record.tool,
                record.outcome.as_str(),
                record.error,
                context,
                record.request_id,
                record.recorded_at.as_str()
            ],
        )?;
        drop(guard);
        Ok(())
    }
}

// ============================================================================//
// SECTION: Trait Implementations
// ============================================================================//

impl RecordStore for SqliteCrmStore {
    fn insert(
        &self,
        domain: ResourceDomain,
        fields: Map<String, Value>,
    ) -> Result<StoredRecord, StoreError> {
        self.insert_record(domain, fields).map_err(StoreError::from)
    }

    fn get(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.load_record(domain, id).map_err(StoreError::from)
    }

    fn query(
        &self,
        domain: ResourceDomain,
        query: &RecordQuery,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        self.query_records(domain, query).map_err(StoreError::from)
    }

    fn update(
        &self,
        domain: ResourceDomain,
        id: &RecordId,
        patch: Map<String, Value>,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.update_record(domain, id, patch).map_err(StoreError::from)
    }

    fn delete(&self, domain: ResourceDomain, id: &RecordId) -> Result<bool, StoreError> {
        self.delete_record(domain, id).map_err(StoreError::from)
    }
}

impl AgentDirectory for SqliteCrmStore {
    fn agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, StoreError> {
        self.load_agent(agent_id).map_err(StoreError::from)
    }
}

impl PermissionStore for SqliteCrmStore {
    fn permissions(&self, agent_id: &AgentId) -> Result<Option<PermissionMap>, StoreError> {
        self.load_permissions(agent_id).map_err(StoreError::from)
    }
}

impl AgentAdmin for SqliteCrmStore {
    fn upsert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        self.write_agent(agent).map_err(StoreError::from)
    }

    fn set_permissions(&self, agent_id: &AgentId, map: &PermissionMap) -> Result<(), StoreError> {
        self.write_permissions(agent_id, map).map_err(StoreError::from)
    }

    fn list_agents(&self) -> Result<Vec<Agent>, StoreError> {
        self.read_agents().map_err(StoreError::from)
    }
}

impl DispatchAuditSink for SqliteCrmStore {
    fn append(&self, record: &DispatchRecord) -> Result<(), StoreError> {
        self.write_dispatch_record(record).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Row Decoding
// ============================================================================//

/// Raw record row.
struct RecordRow {
    /// Record id column.
    id: String,
    /// JSON body column.
    body: String,
    /// Creation timestamp column.
    created_at: String,
    /// Update timestamp column.
    updated_at: String,
}

impl RecordRow {
    /// Reads a record row selected with [`RECORD_COLUMNS`].
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    /// Decodes the JSON body.
    fn decode(self) -> Result<StoredRecord, SqliteStoreError> {
        let value: Value = serde_json::from_str(&self.body)
            .map_err(|err| SqliteStoreError::Corrupt(format!("record {}: {err}", self.id)))?;
        let Value::Object(fields) = value else {
            return Err(SqliteStoreError::Corrupt(format!(
                "record {} body is not an object",
                self.id
            )));
        };
        Ok(StoredRecord {
            id: RecordId::new(self.id),
            fields,
            created_at: Timestamp::from_rfc3339(self.created_at),
            updated_at: Timestamp::from_rfc3339(self.updated_at),
        })
    }
}

/// Raw dispatch record row.
struct DispatchRow {
    /// Agent id column.
    agent_id: String,
    /// Domain column.
    domain: String,
    /// Tool column.
    tool: String,
    /// Outcome label column.
    outcome: String,
    /// Optional error column.
    error: Option<String>,
    /// Context JSON column.
    context_json: String,
    /// Optional request id column.
    request_id: Option<String>,
    /// Timestamp column.
    recorded_at: String,
}

impl DispatchRow {
    /// Decodes the row into a dispatch record.
    fn decode(self) -> Result<DispatchRecord, SqliteStoreError> {
        let outcome = DispatchOutcome::parse(&self.outcome).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown dispatch outcome: {}", self.outcome))
        })?;
        let context = serde_json::from_str(&self.context_json)
            .map_err(|err| SqliteStoreError::Corrupt(format!("dispatch context: {err}")))?;
        Ok(DispatchRecord {
            agent_id: AgentId::new(self.agent_id),
            domain: self.domain,
            tool: self.tool,
            outcome,
            error: self.error,
            context,
            request_id: self.request_id,
            recorded_at: Timestamp::from_rfc3339(self.recorded_at),
        })
    }
}

/// Agent columns: id, name, status label.
type AgentRow = (String, String, String);

/// Reads an agent row.
fn agent_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Decodes an agent row.
fn decode_agent(row: AgentRow) -> Result<Agent, SqliteStoreError> {
    let (agent_id, name, status) = row;
    let status = AgentStatus::parse(&status)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown agent status: {status}")))?;
    Ok(Agent {
        agent_id: AgentId::new(agent_id),
        name,
        status,
    })
}

// ============================================================================//
// SECTION: Query Building
// ============================================================================//

/// Appends a filter clause and its bound values.
fn push_filter(sql: &mut String, values: &mut Vec<SqlValue>, filter: &FieldFilter) {
    let Some(operand) = scalar_value(&filter.value) else {
        sql.push_str(" AND 0");
        return;
    };
    let expression = field_expression(&filter.field, values);
    sql.push_str(&format!(" AND {expression} {} ?", filter.op.sql_operator()));
    values.push(operand);
}

/// Returns the SQL expression for a field, binding a JSON path when needed.
fn field_expression(field: &str, values: &mut Vec<SqlValue>) -> &'static str {
    match field {
        ID_FIELD => "id",
        CREATED_AT_FIELD => "created_at",
        UPDATED_AT_FIELD => "updated_at",
        _ => {
            values.push(SqlValue::Text(json_path(field)));
            "json_extract(body, ?)"
        }
    }
}

/// Builds a quoted `json_extract` path for a top-level key.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Converts a JSON scalar to a bound `SQLite` value.
fn scalar_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(text) => Some(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Some(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Converts a pagination bound to an `SQLite` integer.
fn to_sql_int(value: usize) -> Result<i64, SqliteStoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid("pagination bound too large".to_string()))
}

/// Serializes a record body.
fn encode_body(fields: &Map<String, Value>) -> Result<String, SqliteStoreError> {
    serde_json::to_string(fields).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    domain TEXT NOT NULL,
                    id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (domain, id)
                );
                CREATE INDEX IF NOT EXISTS idx_records_domain ON records (domain, seq);
                CREATE TABLE IF NOT EXISTS agents (
                    agent_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    status TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS agent_permissions (
                    agent_id TEXT PRIMARY KEY,
                    permissions_json TEXT NOT NULL,
                    FOREIGN KEY (agent_id) REFERENCES agents(agent_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS dispatch_records (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    agent_id TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    tool TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    error TEXT,
                    context_json TEXT NOT NULL,
                    request_id TEXT,
                    recorded_at TEXT NOT NULL
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

// ============================================================================//
// SECTION: Tests
// ============================================================================//
