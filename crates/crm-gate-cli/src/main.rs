// crm-gate-cli/src/main.rs
// ============================================================================
// Module: CRM Gate CLI Entry Point
// Description: Command dispatcher for the CRM Gate MCP server and its store.
// Purpose: Serve tools, check config, and administer agents and audit data.
// Dependencies: clap, crm-gate-config, crm-gate-core, crm-gate-mcp,
//               crm-gate-store-sqlite, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The `crm-gate` binary starts the MCP server and offers the administrative
//! surface the dispatcher deliberately lacks: creating agents, editing their
//! permission maps, and reading the dispatch audit trail from a `SQLite`
//! store. Output goes to stdout; errors go to stderr with a failure code.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use crm_gate_config::CrmGateConfig;
use crm_gate_config::config_toml_example;
use crm_gate_config::validate_agent_id;
use crm_gate_config::validate_permission_map;
use crm_gate_core::Agent;
use crm_gate_core::AgentAdmin;
use crm_gate_core::AgentDirectory;
use crm_gate_core::AgentId;
use crm_gate_core::AgentStatus;
use crm_gate_core::DispatchRecord;
use crm_gate_core::DomainGrant;
use crm_gate_core::InMemoryCrmStore;
use crm_gate_core::PermissionMap;
use crm_gate_core::PermissionStore;
use crm_gate_core::RecordStore;
use crm_gate_core::ResourceDomain;
use crm_gate_core::StoreError;
use crm_gate_core::ToolName;
use crm_gate_mcp::McpServer;
use crm_gate_mcp::ToolDefinition;
use crm_gate_mcp::build_registry;
use crm_gate_store_sqlite::SqliteCrmStore;
use crm_gate_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default number of audit records printed by `audit tail`.
const DEFAULT_AUDIT_TAIL: usize = 20;
/// Upper bound on `audit tail --limit`.
const MAX_AUDIT_TAIL: usize = 10_000;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "crm-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the CRM Gate MCP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Tool catalog utilities.
    Tools {
        /// Selected tools subcommand.
        #[command(subcommand)]
        command: ToolsCommand,
    },
    /// Agent and permission administration on a `SQLite` store.
    Agent {
        /// Selected agent subcommand.
        #[command(subcommand)]
        command: AgentCommand,
    },
    /// Dispatch audit trail utilities.
    Audit {
        /// Selected audit subcommand.
        #[command(subcommand)]
        command: AuditCommand,
    },
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to the config file (defaults to `CRM_GATE_CONFIG` or `crm-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigValidateCommand),
    /// Print an annotated example config.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Tools subcommands.
#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// List every registered tool.
    List(ToolsListCommand),
}

/// Arguments for `tools list`.
#[derive(Args, Debug)]
struct ToolsListCommand {
    /// Print full definitions, including input schemas, as JSON.
    #[arg(long)]
    json: bool,
}

/// Store location shared by the administrative commands.
#[derive(Args, Debug)]
struct StoreArgs {
    /// Path to the `SQLite` database.
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
}

/// Agent subcommands.
#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Create or update an agent.
    Add(AgentAddCommand),
    /// Enable tools within one domain for an agent.
    Grant(AgentGrantCommand),
    /// Disable one domain for an agent.
    Revoke(AgentRevokeCommand),
    /// List agents and their status.
    List(StoreArgs),
    /// Print an agent's permission map as JSON.
    Show(AgentShowCommand),
}

/// Arguments for `agent add`.
#[derive(Args, Debug)]
struct AgentAddCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Agent identifier.
    #[arg(long, value_name = "ID")]
    agent_id: String,
    /// Display name.
    #[arg(long)]
    name: String,
    /// Activation status.
    #[arg(long, value_enum, default_value_t = StatusArg::Active)]
    status: StatusArg,
}

/// Arguments for `agent grant`.
#[derive(Args, Debug)]
struct AgentGrantCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Agent identifier.
    #[arg(long, value_name = "ID")]
    agent_id: String,
    /// Resource domain to enable.
    #[arg(long, value_enum)]
    domain: DomainArg,
    /// Tool to enable; repeat for several. Defaults to every tool in the domain.
    #[arg(long = "tool", value_name = "TOOL")]
    tools: Vec<String>,
}

/// Arguments for `agent revoke`.
#[derive(Args, Debug)]
struct AgentRevokeCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Agent identifier.
    #[arg(long, value_name = "ID")]
    agent_id: String,
    /// Resource domain to disable.
    #[arg(long, value_enum)]
    domain: DomainArg,
}

/// Arguments for `agent show`.
#[derive(Args, Debug)]
struct AgentShowCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Agent identifier.
    #[arg(long, value_name = "ID")]
    agent_id: String,
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Print the most recent dispatch records as JSON lines.
    Tail(AuditTailCommand),
}

/// Arguments for `audit tail`.
#[derive(Args, Debug)]
struct AuditTailCommand {
    /// Store location.
    #[command(flatten)]
    store: StoreArgs,
    /// Number of records to print.
    #[arg(long, default_value_t = DEFAULT_AUDIT_TAIL)]
    limit: usize,
}

/// Agent status selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StatusArg {
    /// Agent may invoke tools.
    Active,
    /// Agent is disabled.
    Inactive,
}

impl From<StatusArg> for AgentStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Inactive => Self::Inactive,
        }
    }
}

/// Resource domain selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum DomainArg {
    /// Tasks.
    Tasks,
    /// Leads.
    Leads,
    /// Contacts.
    Contacts,
    /// Appointments.
    Appointments,
    /// Invoices.
    Invoices,
}

impl From<DomainArg> for ResourceDomain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Tasks => Self::Tasks,
            DomainArg::Leads => Self::Leads,
            DomainArg::Contacts => Self::Contacts,
            DomainArg::Appointments => Self::Appointments,
            DomainArg::Invoices => Self::Invoices,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures, rendered to stderr.
#[derive(Debug, Error)]
enum CliError {
    /// Config could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// Store could not be opened or queried.
    #[error("store error: {0}")]
    Store(String),
    /// Server initialization or serving failed.
    #[error("server error: {0}")]
    Server(String),
    /// Command arguments were rejected.
    #[error("invalid input: {0}")]
    Invalid(String),
    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<StoreError> for CliError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Tools {
            command,
        } => command_tools(&command),
        Commands::Agent {
            command,
        } => command_agent(command),
        Commands::Audit {
            command,
        } => command_audit(&command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = CrmGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::Config(err.to_string()))?;
    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::Server(format!("init join failed: {err}")))?
        .map_err(|err| CliError::Server(err.to_string()))?;
    server.serve().await.map_err(|err| CliError::Server(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => {
            let config = CrmGateConfig::load(command.config.as_deref())
                .map_err(|err| CliError::Config(err.to_string()))?;
            write_stdout_line(&format!("config ok ({} seed agents)", config.agents.len()))?;
        }
        ConfigCommand::Example => write_stdout_line(config_toml_example().trim_end())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Tools Commands
// ============================================================================

/// Dispatches tools subcommands.
fn command_tools(command: &ToolsCommand) -> CliResult<ExitCode> {
    let ToolsCommand::List(command) = command;
    let definitions = tool_definitions()?;
    if command.json {
        let text = serde_json::to_string_pretty(&definitions)
            .map_err(|err| CliError::Output(err.to_string()))?;
        write_stdout_line(&text)?;
    } else {
        write_stdout_line(render_tools(&definitions).trim_end())?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns the published tool catalog.
fn tool_definitions() -> CliResult<Vec<ToolDefinition>> {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryCrmStore::new());
    let registry = build_registry(&store).map_err(|err| CliError::Server(err.to_string()))?;
    Ok(registry.definitions())
}

/// Renders one `name  domain  description` line per tool.
fn render_tools(definitions: &[ToolDefinition]) -> String {
    let width = definitions.iter().map(|def| def.name.as_str().len()).max().unwrap_or(0);
    let mut output = String::new();
    for definition in definitions {
        output.push_str(&format!(
            "{:<width$}  {:<12}  {}\n",
            definition.name.as_str(),
            definition.name.domain().as_str(),
            definition.description,
        ));
    }
    output
}

// ============================================================================
// SECTION: Agent Commands
// ============================================================================

/// Dispatches agent subcommands.
fn command_agent(command: AgentCommand) -> CliResult<ExitCode> {
    match command {
        AgentCommand::Add(command) => {
            let store = open_store(&command.store.db)?;
            let agent = add_agent(&store, &command.agent_id, &command.name, command.status.into())?;
            write_stdout_line(&format!("agent {} saved ({})", agent.agent_id, agent.status.as_str()))?;
        }
        AgentCommand::Grant(command) => {
            let store = open_store(&command.store.db)?;
            let domain = ResourceDomain::from(command.domain);
            let map = grant_tools(&store, &command.agent_id, domain, &command.tools)?;
            write_permissions(&command.agent_id, &map)?;
        }
        AgentCommand::Revoke(command) => {
            let store = open_store(&command.store.db)?;
            let map = revoke_domain(&store, &command.agent_id, command.domain.into())?;
            write_permissions(&command.agent_id, &map)?;
        }
        AgentCommand::List(args) => {
            let store = open_store(&args.db)?;
            let agents = store.list_agents()?;
            if agents.is_empty() {
                write_stdout_line("no agents")?;
            } else {
                write_stdout_line(render_agents(&agents).trim_end())?;
            }
        }
        AgentCommand::Show(command) => {
            let store = open_store(&command.store.db)?;
            let agent_id = existing_agent(&store, &command.agent_id)?;
            let map = store.permissions(&agent_id)?.unwrap_or_default();
            write_permissions(&command.agent_id, &map)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Creates or updates an agent without touching its permissions.
fn add_agent<S>(store: &S, agent_id: &str, name: &str, status: AgentStatus) -> CliResult<Agent>
where
    S: AgentAdmin + PermissionStore,
{
    validate_agent_id(agent_id).map_err(|err| CliError::Invalid(err.to_string()))?;
    if name.trim().is_empty() {
        return Err(CliError::Invalid("agent name must be non-empty".to_string()));
    }
    let agent = Agent {
        agent_id: AgentId::new(agent_id),
        name: name.to_string(),
        status,
    };
    store.upsert_agent(&agent)?;
    if store.permissions(&agent.agent_id)?.is_none() {
        store.set_permissions(&agent.agent_id, &PermissionMap::empty())?;
    }
    Ok(agent)
}

/// Enables `tools` within `domain`, merging with the agent's existing grant.
///
/// An empty tool list enables every tool of the domain.
fn grant_tools<S>(
    store: &S,
    agent_id: &str,
    domain: ResourceDomain,
    tools: &[String],
) -> CliResult<PermissionMap>
where
    S: AgentAdmin + AgentDirectory + PermissionStore,
{
    let agent_id = existing_agent(store, agent_id)?;
    let mut map = store.permissions(&agent_id)?.unwrap_or_default();
    let mut grant = map.grant(domain.as_str()).cloned().unwrap_or_default();
    grant.enabled = true;
    if tools.is_empty() {
        grant.tools.extend(
            ToolName::all()
                .iter()
                .filter(|tool| tool.domain() == domain)
                .map(|tool| tool.as_str().to_string()),
        );
    } else {
        grant.tools.extend(tools.iter().map(|tool| tool.trim().to_string()));
    }
    map.set_domain(domain.as_str(), grant);
    validate_permission_map(agent_id.as_str(), &map)
        .map_err(|err| CliError::Invalid(err.to_string()))?;
    store.set_permissions(&agent_id, &map)?;
    Ok(map)
}

/// Disables `domain` for the agent and clears its tool list.
fn revoke_domain<S>(store: &S, agent_id: &str, domain: ResourceDomain) -> CliResult<PermissionMap>
where
    S: AgentAdmin + AgentDirectory + PermissionStore,
{
    let agent_id = existing_agent(store, agent_id)?;
    let mut map = store.permissions(&agent_id)?.unwrap_or_default();
    map.set_domain(domain.as_str(), DomainGrant::default());
    store.set_permissions(&agent_id, &map)?;
    Ok(map)
}

/// Resolves an agent identifier that must already exist.
fn existing_agent<S: AgentDirectory>(store: &S, agent_id: &str) -> CliResult<AgentId> {
    let agent_id = AgentId::new(agent_id);
    match store.agent(&agent_id)? {
        Some(_) => Ok(agent_id),
        None => Err(CliError::Invalid(format!("agent {agent_id} does not exist"))),
    }
}

/// Renders one `agent_id  status  name` line per agent.
fn render_agents(agents: &[Agent]) -> String {
    let width = agents.iter().map(|agent| agent.agent_id.as_str().len()).max().unwrap_or(0);
    let mut output = String::new();
    for agent in agents {
        output.push_str(&format!(
            "{:<width$}  {:<8}  {}\n",
            agent.agent_id.as_str(),
            agent.status.as_str(),
            agent.name,
        ));
    }
    output
}

/// Prints a permission map as pretty JSON.
fn write_permissions(agent_id: &str, map: &PermissionMap) -> CliResult<()> {
    let value = serde_json::json!({ "agent_id": agent_id, "permissions": map });
    let text =
        serde_json::to_string_pretty(&value).map_err(|err| CliError::Output(err.to_string()))?;
    write_stdout_line(&text)
}

// ============================================================================
// SECTION: Audit Commands
// ============================================================================

/// Dispatches audit subcommands.
fn command_audit(command: &AuditCommand) -> CliResult<ExitCode> {
    let AuditCommand::Tail(command) = command;
    let records = tail_records(&open_store(&command.store.db)?, command.limit)?;
    for record in &records {
        let line =
            serde_json::to_string(record).map_err(|err| CliError::Output(err.to_string()))?;
        write_stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads the most recent `limit` audit records.
fn tail_records(store: &SqliteCrmStore, limit: usize) -> CliResult<Vec<DispatchRecord>> {
    if limit == 0 || limit > MAX_AUDIT_TAIL {
        return Err(CliError::Invalid(format!("limit must be 1..={MAX_AUDIT_TAIL}")));
    }
    store.recent_dispatch_records(limit).map_err(|err| CliError::Store(err.to_string()))
}

// ============================================================================
// SECTION: Store Helpers
// ============================================================================

/// Opens the `SQLite` store at `path`, creating it when missing.
fn open_store(path: &Path) -> CliResult<SqliteCrmStore> {
    SqliteCrmStore::new(&SqliteStoreConfig::new(path))
        .map_err(|err| CliError::Store(err.to_string()))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Output(err.to_string()))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
