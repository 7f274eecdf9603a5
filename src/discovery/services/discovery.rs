//! Validated discovery triggers and discovered-service listing.

use crate::agent::domain::AgentId;
use crate::agent::ports::AgentRegistryRepository;
use crate::agent::services::{AgentRegistryService, AgentRegistryServiceError};
use crate::discovery::domain::DiscoveryTarget;
use crate::error::ErrorCode;
use crate::gateway::domain::{PackageKind, ServiceList};
use crate::gateway::ports::{AgentGateway, AgentGatewayError, CatalogGateway, CatalogGatewayError};
use crate::hierarchy::services::{ReplicationError, StructureReplicator};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Service-level errors for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The agent is unknown or cannot be driven.
    #[error(transparent)]
    Agent(#[from] AgentRegistryServiceError),
    /// The workspace could not be looked up.
    #[error("failed to get workspace by id: {0}")]
    WorkspaceLookup(CatalogGatewayError),
    /// The workspace does not exist or is not a workspace.
    #[error("Workspace '{0}' not found")]
    WorkspaceNotFound(String),
    /// The agent namespaces could not be listed.
    #[error("failed to list agent namespaces: {0}")]
    NamespaceLookup(AgentGatewayError),
    /// The agent does not see the namespace.
    #[error("Namespace '{namespace}' not found for agent '{agent_id}'")]
    NamespaceNotFound {
        /// Requested namespace.
        namespace: String,
        /// Agent that was asked.
        agent_id: AgentId,
    },
    /// The service names of the namespace could not be listed.
    #[error("failed to list namespace service names: {0}")]
    ServiceNames(AgentGatewayError),
    /// Mirroring the default workspace structure failed.
    #[error("failed to copy package services from '{source_workspace}' to '{target_workspace}': {source}")]
    Replication {
        /// Workspace the structure is copied from.
        source_workspace: String,
        /// Workspace the structure is copied into.
        target_workspace: String,
        /// Why replication failed.
        #[source]
        source: Box<ReplicationError>,
    },
    /// The agent refused to start discovery.
    #[error("failed to start service discovery: {0}")]
    Start(AgentGatewayError),
    /// The agent could not list discovered services.
    #[error("failed to get service list: {0}")]
    ListServices(AgentGatewayError),
}

impl DiscoveryError {
    /// Returns the caller-facing code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Agent(err) => err.code(),
            Self::WorkspaceLookup(err) => err.code(),
            Self::WorkspaceNotFound(_) => Some(ErrorCode::WorkspaceNotFound),
            Self::NamespaceNotFound { .. } => Some(ErrorCode::NamespaceNotFound),
            Self::NamespaceLookup(err)
            | Self::ServiceNames(err)
            | Self::Start(err)
            | Self::ListServices(err) => err.code(),
            Self::Replication { .. } => None,
        }
    }
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Starts discovery on agents and relays what they found.
pub struct DiscoveryService<R, K, C, A>
where
    R: AgentRegistryRepository,
    K: Clock + Send + Sync,
    C: CatalogGateway,
    A: AgentGateway,
{
    agents: AgentRegistryService<R, K>,
    catalog: Arc<C>,
    agent: Arc<A>,
    replicator: StructureReplicator<C>,
    default_workspace_id: Option<String>,
}

impl<R, K, C, A> DiscoveryService<R, K, C, A>
where
    R: AgentRegistryRepository,
    K: Clock + Send + Sync,
    C: CatalogGateway,
    A: AgentGateway,
{
    /// Creates a discovery service.
    ///
    /// When `default_workspace_id` is set, discovery into any other
    /// workspace first mirrors the default workspace's service structure.
    #[must_use]
    pub fn new(
        agents: AgentRegistryService<R, K>,
        catalog: Arc<C>,
        agent: Arc<A>,
        default_workspace_id: Option<String>,
    ) -> Self {
        Self {
            replicator: StructureReplicator::new(Arc::clone(&catalog)),
            agents,
            catalog,
            agent,
            default_workspace_id: default_workspace_id.filter(|id| !id.is_empty()),
        }
    }

    /// Checks that the agent is usable, the namespace is visible to the
    /// agent, and the workspace exists, reporting the first failure in that
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Agent`] for unknown or unusable agents,
    /// [`DiscoveryError::NamespaceNotFound`],
    /// [`DiscoveryError::WorkspaceNotFound`], or the lookup failure.
    pub async fn resolve_target(
        &self,
        agent_id: &AgentId,
        namespace: &str,
        workspace_id: &str,
    ) -> DiscoveryResult<DiscoveryTarget> {
        let agent = self.agents.resolve_usable(agent_id).await?;
        let namespaces = self
            .agent
            .list_namespaces(agent.url())
            .await
            .map_err(DiscoveryError::NamespaceLookup)?;
        if !namespaces.contains(namespace) {
            return Err(DiscoveryError::NamespaceNotFound {
                namespace: namespace.to_owned(),
                agent_id: agent_id.clone(),
            });
        }
        let workspace = self
            .catalog
            .get_package(workspace_id)
            .await
            .map_err(DiscoveryError::WorkspaceLookup)?
            .filter(|package| package.kind == PackageKind::Workspace)
            .ok_or_else(|| DiscoveryError::WorkspaceNotFound(workspace_id.to_owned()))?;
        let cloud_name = if namespaces.cloud_name.is_empty() {
            agent.cloud().to_owned()
        } else {
            namespaces.cloud_name
        };
        Ok(DiscoveryTarget {
            agent,
            namespace: namespace.to_owned(),
            workspace,
            cloud_name,
        })
    }

    /// Validates the target, mirrors the default workspace structure when
    /// needed, and triggers discovery.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::resolve_target`],
    /// [`DiscoveryError::Replication`] when mirroring fails, and
    /// [`DiscoveryError::Start`] when the agent refuses the trigger.
    pub async fn start_discovery(
        &self,
        agent_id: &AgentId,
        namespace: &str,
        workspace_id: &str,
        fail_on_error: bool,
    ) -> DiscoveryResult<DiscoveryTarget> {
        let target = self.resolve_target(agent_id, namespace, workspace_id).await?;
        self.mirror_default_structure(&target).await?;
        self.trigger(&target, fail_on_error).await?;
        info!(
            agent_id = %agent_id,
            namespace,
            workspace_id,
            "service discovery started"
        );
        Ok(target)
    }

    /// Triggers discovery on an already validated target.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Start`] when the agent refuses the trigger.
    pub async fn trigger(&self, target: &DiscoveryTarget, fail_on_error: bool) -> DiscoveryResult<()> {
        self.agent
            .start_discovery(
                target.agent_url(),
                &target.namespace,
                target.workspace_id(),
                fail_on_error,
            )
            .await
            .map_err(DiscoveryError::Start)
    }

    /// Lists the services discovered so far in a namespace.
    ///
    /// Only the agent's registration is checked; inactive agents are still
    /// asked.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Agent`] for unknown agents and
    /// [`DiscoveryError::ListServices`] when the agent call fails.
    pub async fn list_services(
        &self,
        agent_id: &AgentId,
        namespace: &str,
        workspace_id: &str,
    ) -> DiscoveryResult<ServiceList> {
        let instance = self
            .agents
            .find(agent_id)
            .await?
            .ok_or_else(|| AgentRegistryServiceError::NotFound(agent_id.clone()))?;
        self.agent
            .list_services(instance.record.url(), namespace, workspace_id)
            .await
            .map_err(DiscoveryError::ListServices)
    }

    /// Lists the services discovered so far for a validated target.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::ListServices`] when the agent call fails.
    pub async fn list_target_services(&self, target: &DiscoveryTarget) -> DiscoveryResult<ServiceList> {
        self.agent
            .list_services(target.agent_url(), &target.namespace, target.workspace_id())
            .await
            .map_err(DiscoveryError::ListServices)
    }

    async fn mirror_default_structure(&self, target: &DiscoveryTarget) -> DiscoveryResult<()> {
        let Some(default_workspace) = self
            .default_workspace_id
            .as_deref()
            .filter(|id| *id != target.workspace_id())
        else {
            return Ok(());
        };
        let names = self
            .agent
            .list_service_names(target.agent_url(), &target.namespace)
            .await
            .map_err(DiscoveryError::ServiceNames)?;
        if names.is_empty() {
            return Ok(());
        }
        let service_names: Vec<String> = names.into_iter().map(|name| name.id).collect();
        let report = self
            .replicator
            .replicate_structure(
                default_workspace,
                target.workspace_id(),
                &service_names,
                &target.workspace.default_role,
            )
            .await
            .map_err(|err| DiscoveryError::Replication {
                source_workspace: default_workspace.to_owned(),
                target_workspace: target.workspace_id().to_owned(),
                source: Box::new(err),
            })?;
        if !report.is_noop() {
            info!(
                source_workspace = default_workspace,
                target_workspace = target.workspace_id(),
                groups = report.created_groups.len(),
                packages = report.created_packages.len(),
                "mirrored service structure"
            );
        }
        Ok(())
    }
}
