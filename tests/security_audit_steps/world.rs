//! Shared world state for security audit BDD scenarios.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use apihub_agents::agent::adapters::memory::InMemoryAgentRegistry;
use apihub_agents::agent::domain::AgentId;
use apihub_agents::agent::services::AgentRegistryService;
use apihub_agents::config::AuditConfig;
use apihub_agents::discovery::services::DiscoveryService;
use apihub_agents::gateway::adapters::memory::{InMemoryCatalog, ScriptedAgent};
use apihub_agents::gateway::domain::{DiscoveredService, RestOperation};
use apihub_agents::hierarchy::domain::SnapshotTree;
use apihub_agents::security_check::adapters::memory::InMemoryAuditRepository;
use apihub_agents::security_check::domain::{ProcessId, ProcessSummary};
use apihub_agents::security_check::ports::AuditRepository;
use apihub_agents::security_check::services::{
    SecurityCheckError, SecurityCheckService, SecurityReportService,
};
use apihub_agents::snapshot::services::SnapshotService;
use eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use rstest::fixture;

/// Alias of the snapshot group used by every scenario.
pub const SNAPSHOTS_ALIAS: &str = "RUNENV";

/// Check service wired to in-memory adapters.
pub type TestCheckService = SecurityCheckService<
    InMemoryAuditRepository,
    InMemoryAgentRegistry,
    DefaultClock,
    InMemoryCatalog,
    ScriptedAgent,
>;

/// Scenario world for security audit behaviour tests.
pub struct AuditWorld {
    /// Agent registry backing discovery.
    pub registry: Arc<InMemoryAgentRegistry>,
    /// Catalog double.
    pub catalog: Arc<InMemoryCatalog>,
    /// Agent double.
    pub agent: Arc<ScriptedAgent>,
    /// Security check store.
    pub repository: Arc<InMemoryAuditRepository>,
    /// Cloud of the scenario agent.
    pub cloud: String,
    /// Agent registered by the background.
    pub agent_id: Option<AgentId>,
    /// Services the agent will discover.
    pub services: Vec<DiscoveredService>,
    /// Operations declared per service.
    pub operations: BTreeMap<String, Vec<RestOperation>>,
    /// Process started by the last `when` step.
    pub process_id: Option<ProcessId>,
    /// Error of the last rejected request.
    pub last_error: Option<SecurityCheckError>,
}

impl AuditWorld {
    /// Creates a world with empty doubles.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(InMemoryAgentRegistry::new()),
            catalog: Arc::new(InMemoryCatalog::new()),
            agent: Arc::new(ScriptedAgent::new("prod")),
            repository: Arc::new(InMemoryAuditRepository::new()),
            cloud: "prod".to_owned(),
            agent_id: None,
            services: Vec::new(),
            operations: BTreeMap::new(),
            process_id: None,
            last_error: None,
        }
    }

    /// Returns a registry service over the world's registry.
    #[must_use]
    pub fn agents(&self) -> AgentRegistryService<InMemoryAgentRegistry, DefaultClock> {
        AgentRegistryService::new(
            Arc::clone(&self.registry),
            Arc::new(DefaultClock),
            Duration::from_secs(30),
        )
    }

    /// Wires the check service with short polling intervals.
    #[must_use]
    pub fn checks(&self) -> TestCheckService {
        let discovery = Arc::new(DiscoveryService::new(
            self.agents(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.agent),
            None,
        ));
        let snapshots = SnapshotService::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.agent),
            Arc::from("https://hub"),
            SNAPSHOTS_ALIAS,
        );
        let settings = AuditConfig {
            discovery_poll_interval_ms: 5,
            discovery_deadline_ms: 2_000,
            publish_poll_interval_ms: 5,
            publish_deadline_ms: 2_000,
            ..AuditConfig::default()
        };
        SecurityCheckService::new(
            discovery,
            snapshots,
            Arc::clone(&self.repository),
            Arc::new(DefaultClock),
            settings,
        )
    }

    /// Returns the read side over the world's store.
    #[must_use]
    pub fn reports(&self) -> SecurityReportService<InMemoryAuditRepository, InMemoryCatalog> {
        SecurityReportService::new(Arc::clone(&self.repository), Arc::clone(&self.catalog))
    }

    /// Returns the package a service of namespace `team` is published into.
    #[must_use]
    pub fn package_id(&self, service_id: &str) -> String {
        SnapshotTree::new("WS", SNAPSHOTS_ALIAS, self.cloud.as_str(), "team")
            .service_package_id(service_id)
    }

    /// Waits for the started process to reach a terminal status.
    ///
    /// # Errors
    ///
    /// Fails when no process was started, it cannot be read, or it does not
    /// finish in time.
    pub fn finished(&self) -> Result<ProcessSummary, eyre::Report> {
        let process_id = self
            .process_id
            .ok_or_else(|| eyre!("no security check was started"))?;
        let repository = Arc::clone(&self.repository);
        run_async(async move {
            tokio::time::timeout(Duration::from_secs(10), async {
                loop {
                    let summary = repository
                        .find_summary(process_id)
                        .await
                        .wrap_err("read security check summary")?
                        .ok_or_else(|| eyre!("security check {process_id} is missing"))?;
                    if summary.process.status.is_terminal() {
                        return Ok(summary);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .wrap_err("security check did not finish")?
        })
    }
}

impl Default for AuditWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AuditWorld {
    AuditWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
