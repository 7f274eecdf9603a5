//! Operator command line for the agents control plane.
//!
//! ```text
//! agents_ctl [--config agents.toml] <command>
//! ```
//!
//! Commands record agent heartbeats, start security checks, and read their
//! status, listings and exports. When `database_url` is configured every
//! store is `PostgreSQL`; otherwise stores live in memory for the lifetime of
//! the command, so `audit --agent-url ... --wait` is the only useful flow.

use apihub_agents::agent::adapters::memory::InMemoryAgentRegistry;
use apihub_agents::agent::adapters::postgres::PostgresAgentRegistry;
use apihub_agents::agent::domain::{AgentHeartbeat, AgentId};
use apihub_agents::agent::ports::AgentRegistryRepository;
use apihub_agents::agent::services::AgentRegistryService;
use apihub_agents::config::ControlPlaneConfig;
use apihub_agents::discovery::services::DiscoveryService;
use apihub_agents::gateway::adapters::http::{HttpAgentGateway, HttpCatalogGateway};
use apihub_agents::gateway::ports::CatalogGateway;
use apihub_agents::security_check::adapters::memory::InMemoryAuditRepository;
use apihub_agents::security_check::adapters::postgres::{AuditPgPool, PostgresAuditRepository};
use apihub_agents::security_check::domain::{ProcessId, ReportFilter};
use apihub_agents::security_check::ports::AuditRepository;
use apihub_agents::security_check::services::{SecurityCheckService, SecurityReportService};
use apihub_agents::snapshot::services::SnapshotService;
use apihub_agents::telemetry::{self, LogFormat};
use clap::{Parser, Subcommand};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Control plane operator tool.
#[derive(Parser, Debug)]
#[command(name = "agents_ctl", version, about)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, env = "AGENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "AGENTS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Records a heartbeat on behalf of an agent.
    Heartbeat {
        /// Cloud the agent runs in.
        #[arg(long)]
        cloud: String,
        /// Namespace the agent is deployed to.
        #[arg(long)]
        namespace: String,
        /// URL the agent is reachable at.
        #[arg(long)]
        url: String,
        /// Backend version reported by the agent.
        #[arg(long)]
        backend_version: String,
        /// Agent build version.
        #[arg(long)]
        agent_version: Option<String>,
    },
    /// Starts a security check of a namespace.
    Audit {
        /// Registered agent to run the check through.
        #[arg(long, required_unless_present = "agent_url")]
        agent_id: Option<String>,
        /// Registers the agent at this URL before starting.
        #[arg(long, requires_all = ["cloud", "backend_version"])]
        agent_url: Option<String>,
        /// Cloud of the agent registered with `--agent-url`.
        #[arg(long)]
        cloud: Option<String>,
        /// Backend version of the agent registered with `--agent-url`.
        #[arg(long)]
        backend_version: Option<String>,
        /// Namespace to check.
        #[arg(long)]
        namespace: String,
        /// Workspace the snapshot is published into.
        #[arg(long)]
        workspace: String,
        /// Principal recorded as having started the check.
        #[arg(long, default_value = "agents_ctl")]
        started_by: String,
        /// Polls until the check finishes, then prints its export.
        #[arg(long)]
        wait: bool,
    },
    /// Prints the status of a security check.
    Status {
        /// Process id returned by `audit`.
        process_id: ProcessId,
    },
    /// Lists security checks, newest first.
    Reports {
        /// Only checks run through this agent.
        #[arg(long)]
        agent_id: Option<String>,
        /// Only checks of this namespace.
        #[arg(long)]
        namespace: Option<String>,
        /// Only checks publishing into this workspace.
        #[arg(long)]
        workspace: Option<String>,
        /// Zero-based page.
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size.
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Prints every service and endpoint row of a security check.
    Export {
        /// Process id returned by `audit`.
        process_id: ProcessId,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    telemetry::init(format, "info")?;

    let config = match &cli.config {
        Some(path) => ControlPlaneConfig::load(path)?,
        None => ControlPlaneConfig::default(),
    };

    let outcome = match config.database_url.as_deref() {
        Some(url) => {
            let pool: AuditPgPool =
                Pool::builder().build(ConnectionManager::<PgConnection>::new(url))?;
            let registry = Arc::new(PostgresAgentRegistry::new(pool.clone()));
            let audits = Arc::new(PostgresAuditRepository::new(pool));
            execute(&cli.command, &config, registry, audits).await
        }
        None => {
            info!("no database configured, using in-memory stores");
            execute(
                &cli.command,
                &config,
                Arc::new(InMemoryAgentRegistry::new()),
                Arc::new(InMemoryAuditRepository::new()),
            )
            .await
        }
    };
    if let Err(err) = &outcome {
        error!(error = %err, "command failed");
    }
    outcome
}

async fn execute<R, S>(
    command: &Command,
    config: &ControlPlaneConfig,
    registry: Arc<R>,
    audits: Arc<S>,
) -> Result<(), BoxError>
where
    R: AgentRegistryRepository + 'static,
    S: AuditRepository + 'static,
{
    let clock = Arc::new(DefaultClock);
    let catalog = Arc::new(HttpCatalogGateway::new(
        config.catalog_base_url(),
        config.catalog_api_key.as_str(),
        config.http_timeout(),
    )?);
    let agent = Arc::new(HttpAgentGateway::new(
        config.agent_api_key.as_str(),
        config.http_timeout(),
    )?);
    let agents =
        AgentRegistryService::new(registry, Arc::clone(&clock), config.agent_activity_window());
    let reports = SecurityReportService::new(Arc::clone(&audits), Arc::clone(&catalog));

    match command {
        Command::Heartbeat {
            cloud,
            namespace,
            url,
            backend_version,
            agent_version,
        } => {
            let mut heartbeat = AgentHeartbeat::new(cloud, namespace, url, backend_version);
            if let Some(version) = agent_version {
                heartbeat = heartbeat.with_agent_version(version);
            }
            let record = agents.heartbeat(heartbeat).await?;
            info!(agent_id = %record.id(), "heartbeat recorded");
        }
        Command::Audit {
            agent_id,
            agent_url,
            cloud,
            backend_version,
            namespace,
            workspace,
            started_by,
            wait,
        } => {
            let target_agent = match (agent_url, cloud, backend_version) {
                (Some(url), Some(cloud_name), Some(version)) => {
                    let record = agents
                        .heartbeat(AgentHeartbeat::new(cloud_name, namespace, url, version))
                        .await?;
                    record.id().clone()
                }
                _ => AgentId::new(agent_id.clone().unwrap_or_default()),
            };
            let discovery = Arc::new(DiscoveryService::new(
                agents,
                Arc::clone(&catalog),
                Arc::clone(&agent),
                config.default_workspace_id.clone(),
            ));
            let snapshots = SnapshotService::new(
                Arc::clone(&catalog),
                agent,
                config.catalog_base_url(),
                config.snapshots_group_alias.as_str(),
            );
            let checks =
                SecurityCheckService::new(discovery, snapshots, audits, clock, config.audit);
            let process_id = checks
                .start_check(&target_agent, namespace, workspace, started_by)
                .await?;
            info!(%process_id, "security check started");
            if *wait {
                let poll = config.audit.publish_poll_interval();
                loop {
                    let progress = reports.get_status(process_id).await?;
                    if progress.status.is_terminal() {
                        break;
                    }
                    info!(
                        %process_id,
                        processed = progress.services_processed,
                        total = progress.services_total,
                        "security check running"
                    );
                    tokio::time::sleep(poll.max(Duration::from_millis(100))).await;
                }
                emit(&export_document(&reports, process_id).await?)?;
            }
        }
        Command::Status { process_id } => {
            emit(&reports.get_status(*process_id).await?)?;
        }
        Command::Reports {
            agent_id,
            namespace,
            workspace,
            page,
            limit,
        } => {
            let filter = ReportFilter {
                agent_id: agent_id.as_deref().map(AgentId::new),
                namespace: namespace.clone(),
                workspace_id: workspace.clone(),
                page: *page,
                limit: *limit,
            };
            emit(&reports.list_reports(&filter).await?)?;
        }
        Command::Export { process_id } => {
            emit(&export_document(&reports, *process_id).await?)?;
        }
    }
    Ok(())
}

async fn export_document<S, C>(
    reports: &SecurityReportService<S, C>,
    process_id: ProcessId,
) -> Result<serde_json::Value, BoxError>
where
    S: AuditRepository,
    C: CatalogGateway,
{
    let report = reports.export_report(process_id).await?;
    Ok(serde_json::json!({
        "processId": report.summary.process.process_id,
        "status": report.summary.progress(),
        "services": report.services,
        "endpoints": report.endpoints,
    }))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<(), BoxError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
