//! Starting security checks.

use super::error::{SecurityCheckError, SecurityCheckResult};
use super::pipeline::AuditPipeline;
use crate::agent::domain::AgentId;
use crate::agent::ports::AgentRegistryRepository;
use crate::config::AuditConfig;
use crate::discovery::services::DiscoveryService;
use crate::gateway::ports::{AgentGateway, CatalogGateway};
use crate::security_check::domain::{ProcessId, ProcessScope, SecurityCheckProcess};
use crate::security_check::ports::AuditRepository;
use crate::snapshot::services::SnapshotService;
use crate::supervisor::spawn;
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

/// Validates and launches security checks.
///
/// Each accepted check runs as its own background task. Checks against the
/// same namespace are not serialized.
pub struct SecurityCheckService<S, R, K, C, A>
where
    S: AuditRepository + 'static,
    R: AgentRegistryRepository + 'static,
    K: Clock + Send + Sync + 'static,
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    discovery: Arc<DiscoveryService<R, K, C, A>>,
    repository: Arc<S>,
    clock: Arc<K>,
    pipeline: AuditPipeline<S, R, K, C, A>,
}

impl<S, R, K, C, A> SecurityCheckService<S, R, K, C, A>
where
    S: AuditRepository + 'static,
    R: AgentRegistryRepository + 'static,
    K: Clock + Send + Sync + 'static,
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    /// Creates the service.
    ///
    /// `snapshots` publishes the audited services and supplies the catalog
    /// and agent gateways used for probing.
    #[must_use]
    pub fn new(
        discovery: Arc<DiscoveryService<R, K, C, A>>,
        snapshots: SnapshotService<C, A>,
        repository: Arc<S>,
        clock: Arc<K>,
        settings: AuditConfig,
    ) -> Self {
        Self {
            pipeline: AuditPipeline::new(
                Arc::clone(&repository),
                Arc::clone(&discovery),
                snapshots,
                Arc::clone(&clock),
                settings,
            ),
            discovery,
            repository,
            clock,
        }
    }

    /// Starts a check of `namespace` through `agent_id`, publishing into
    /// `workspace_id`, and returns without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityCheckError::Target`] when the agent, namespace or
    /// workspace is invalid, and [`SecurityCheckError::Store`] when the
    /// process cannot be recorded. No process exists in either case.
    pub async fn start_check(
        &self,
        agent_id: &AgentId,
        namespace: &str,
        workspace_id: &str,
        started_by: &str,
    ) -> SecurityCheckResult<ProcessId> {
        let target = self
            .discovery
            .resolve_target(agent_id, namespace, workspace_id)
            .await?;
        let scope = ProcessScope {
            agent_id: target.agent.id().clone(),
            namespace: target.namespace.clone(),
            workspace_id: target.workspace.id.clone(),
            cloud_name: target.cloud_name.clone(),
        };
        let process = SecurityCheckProcess::start(scope, started_by, self.clock.utc());
        let process_id = process.process_id;
        self.repository
            .create_process(&process)
            .await
            .map_err(SecurityCheckError::Store)?;
        info!(
            %process_id,
            agent_id = %agent_id,
            namespace,
            workspace_id,
            started_by,
            "security check accepted"
        );

        let pipeline = self.pipeline.clone();
        spawn("security_check.run", async move {
            pipeline.run(process, &target).await;
        });
        Ok(process_id)
    }
}
