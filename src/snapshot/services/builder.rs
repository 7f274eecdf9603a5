//! Snapshot creation and background publication.

use super::archive::bundle;
use super::error::{SnapshotError, SnapshotResult};
use crate::gateway::domain::{
    BuildConfig, BuildFile, BuildMetadata, BuildRef, DiscoveredService, DiscoveryStatus,
    PackageKind, PublishRequest, VersionStatus,
};
use crate::gateway::ports::{AgentGateway, CatalogGateway};
use crate::hierarchy::domain::SnapshotTree;
use crate::hierarchy::services::SnapshotTreeProvisioner;
use crate::snapshot::domain::{
    CreateSnapshotRequest, DashboardPublish, DispatchHandle, DispatchReport, SnapshotOutcome,
    filter_services, package_overview_url, validate_version_name,
};
use crate::supervisor::{guarded, spawn};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Builds and publishes namespace snapshots, and reads them back.
pub struct SnapshotService<C, A>
where
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    pub(super) catalog: Arc<C>,
    agent: Arc<A>,
    provisioner: SnapshotTreeProvisioner<C>,
    pub(super) catalog_url: Arc<str>,
    pub(super) snapshots_alias: String,
}

impl<C, A> Clone for SnapshotService<C, A>
where
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            agent: Arc::clone(&self.agent),
            provisioner: self.provisioner.clone(),
            catalog_url: Arc::clone(&self.catalog_url),
            snapshots_alias: self.snapshots_alias.clone(),
        }
    }
}

/// Everything the background publication needs, detached from the request.
struct DispatchPlan {
    agent_url: String,
    namespace: String,
    workspace_id: String,
    client_build: bool,
    builder_id: Option<String>,
    entries: Vec<(DiscoveredService, BuildConfig)>,
    dashboard: Option<BuildConfig>,
}

impl<C, A> SnapshotService<C, A>
where
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    /// Creates a snapshot service.
    ///
    /// `catalog_url` prefixes the portal links placed in build
    /// configurations; `snapshots_alias` names the group holding every
    /// snapshot tree of a workspace.
    #[must_use]
    pub fn new(
        catalog: Arc<C>,
        agent: Arc<A>,
        catalog_url: Arc<str>,
        snapshots_alias: impl Into<String>,
    ) -> Self {
        Self {
            provisioner: SnapshotTreeProvisioner::new(Arc::clone(&catalog)),
            catalog,
            agent,
            catalog_url,
            snapshots_alias: snapshots_alias.into(),
        }
    }

    /// Returns the catalog gateway snapshots are published through.
    #[must_use]
    pub fn catalog(&self) -> Arc<C> {
        Arc::clone(&self.catalog)
    }

    /// Returns the agent gateway specifications are fetched from.
    #[must_use]
    pub fn agent(&self) -> Arc<A> {
        Arc::clone(&self.agent)
    }

    /// Returns the catalog base URL used in portal links.
    #[must_use]
    pub fn catalog_url(&self) -> Arc<str> {
        Arc::clone(&self.catalog_url)
    }

    pub(super) fn tree(&self, workspace_id: &str, cloud_name: &str, namespace: &str) -> SnapshotTree {
        SnapshotTree::new(workspace_id, self.snapshots_alias.as_str(), cloud_name, namespace)
    }

    /// Validates `request`, provisions the snapshot tree and returns the
    /// build configurations, publishing them in the background.
    ///
    /// Publication outcome is delivered through
    /// [`SnapshotOutcome::dispatch`]. A service whose specifications cannot
    /// be fetched or whose publication is refused is left out of the
    /// dashboard references and listed in
    /// [`DispatchReport::excluded_services`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the workspace is unknown, the version
    /// label is invalid, discovery has not completed, no service qualifies,
    /// or provisioning fails.
    pub async fn create_snapshot(
        &self,
        request: &CreateSnapshotRequest,
    ) -> SnapshotResult<SnapshotOutcome> {
        info!(
            namespace = %request.namespace,
            workspace_id = %request.workspace_id,
            version = %request.version,
            "creating snapshot"
        );
        let workspace = self
            .catalog
            .get_package(&request.workspace_id)
            .await
            .map_err(SnapshotError::WorkspaceLookup)?;
        if workspace.is_none_or(|package| package.kind != PackageKind::Workspace) {
            return Err(SnapshotError::WorkspaceNotFound(request.workspace_id.clone()));
        }
        validate_version_name(&request.version)?;

        let listing = self
            .agent
            .list_services(&request.agent_url, &request.namespace, &request.workspace_id)
            .await?;
        if listing.status != DiscoveryStatus::Complete {
            info!(
                namespace = %request.namespace,
                status = %listing.status,
                "snapshot refused, discovery incomplete"
            );
            return Err(SnapshotError::DiscoveryIncomplete(listing.status));
        }
        let services = filter_services(listing.services, &request.services, request.promote);
        if services.is_empty() {
            return Err(SnapshotError::NoServices(request.namespace.clone()));
        }

        let tree = self.tree(&request.workspace_id, &request.cloud_name, &request.namespace);
        let prepared = if request.promote {
            None
        } else {
            let group_id = self.provisioner.prepare_namespace_group(&tree).await?;
            let dashboard_id = self.provisioner.prepare_dashboard(&tree).await?;
            let package_ids = self.provisioner.prepare_packages(&tree, &services).await?;
            Some((group_id, dashboard_id, package_ids))
        };

        let configs = join_all(
            services
                .iter()
                .map(|service| self.service_config(request, &tree, service)),
        )
        .await;

        let dashboard = prepared.map(|(_, dashboard_id, package_ids)| {
            let mut config =
                BuildConfig::new(dashboard_id, request.version.as_str(), VersionStatus::DRAFT);
            config.refs = package_ids
                .into_iter()
                .map(|ref_id| BuildRef {
                    ref_id,
                    version: request.version.clone(),
                })
                .collect();
            config.publish_id = Uuid::new_v4().to_string();
            config.created_by.clone_from(&request.created_by);
            config
        });

        let (sender, receiver) = oneshot::channel();
        let handle = DispatchHandle::new(
            receiver,
            services.iter().map(|service| service.id.clone()).collect(),
        );
        let outcome = SnapshotOutcome {
            dashboard: dashboard.as_ref().map(|config| DashboardPublish {
                package_id: config.package_id.clone(),
                publish_id: config.publish_id.clone(),
            }),
            services: configs.clone(),
            dispatch: handle,
        };

        let plan = DispatchPlan {
            agent_url: request.agent_url.clone(),
            namespace: request.namespace.clone(),
            workspace_id: request.workspace_id.clone(),
            client_build: request.client_build,
            builder_id: request.builder_id.clone(),
            entries: services.into_iter().zip(configs).collect(),
            dashboard,
        };
        let catalog = Arc::clone(&self.catalog);
        let agent = Arc::clone(&self.agent);
        spawn("snapshot.dispatch", async move {
            let report = dispatch(catalog.as_ref(), agent.as_ref(), plan).await;
            if sender.send(report).is_err() {
                debug!("snapshot dispatch report was not awaited");
            }
        });

        Ok(outcome)
    }

    async fn service_config(
        &self,
        request: &CreateSnapshotRequest,
        tree: &SnapshotTree,
        service: &DiscoveredService,
    ) -> BuildConfig {
        let previous_version = self.previous_version(request, service).await;
        let (package_id, previous_version_package_id) = match service.baseline_package_id() {
            Some(baseline) if request.promote => (baseline.to_owned(), None),
            baseline => (
                tree.service_package_id(&service.id),
                previous_version
                    .as_ref()
                    .and(baseline)
                    .map(ToOwned::to_owned),
            ),
        };

        let mut config = BuildConfig::new(
            package_id,
            request.version.as_str(),
            request.version_status.as_str(),
        );
        config.apihub_package_url =
            package_overview_url(&self.catalog_url, &config.package_id, &request.version);
        config.previous_version = previous_version;
        config.previous_version_package_id = previous_version_package_id;
        config.publish_id = Uuid::new_v4().to_string();
        config.service_id.clone_from(&service.id);
        config.created_by.clone_from(&request.created_by);
        config.metadata = BuildMetadata {
            version_labels: service
                .service_labels
                .iter()
                .map(|(key, value)| format!("{key}:{value}"))
                .collect(),
            cloud_name: request.cloud_name.clone(),
            namespace: request.namespace.clone(),
        };
        config.files = service
            .documents
            .iter()
            .map(|document| BuildFile {
                file_id: document.file_id.clone(),
                publish: true,
                labels: Vec::new(),
                x_api_kind: document.x_api_kind.clone(),
            })
            .collect();
        debug!(package_id = %config.package_id, publish_id = %config.publish_id, "generated build config");
        config
    }

    /// Keeps the requested previous version only when the service baseline
    /// has it published outside draft.
    async fn previous_version(
        &self,
        request: &CreateSnapshotRequest,
        service: &DiscoveredService,
    ) -> Option<String> {
        let version = request.previous_version.as_deref()?;
        let baseline = service.baseline_package_id()?;
        match self.catalog.get_version(baseline, version).await {
            Ok(Some(content)) if !content.is_draft() => Some(version.to_owned()),
            Ok(_) => None,
            Err(err) => {
                error!(
                    package_id = baseline,
                    version,
                    error = %err,
                    "failed to get previous version, comparison link dropped"
                );
                None
            }
        }
    }
}

async fn dispatch<C, A>(catalog: &C, agent: &A, plan: DispatchPlan) -> DispatchReport
where
    C: CatalogGateway,
    A: AgentGateway,
{
    let publications = plan.entries.iter().map(|(service, config)| {
        guarded(
            "snapshot.publish_service",
            publish_service(catalog, agent, &plan, service, config),
        )
    });
    let outcomes = join_all(publications).await;

    let mut report = DispatchReport::default();
    for ((service, _), outcome) in plan.entries.iter().zip(outcomes) {
        match outcome.map_err(|panicked| panicked.to_string()).and_then(|published| published) {
            Ok(publish_id) => report.dispatched.push(publish_id),
            Err(reason) => {
                warn!(service_id = %service.id, %reason, "service left out of snapshot");
                report.excluded_services.insert(service.id.clone(), reason);
            }
        }
    }

    if let Some(config) = plan.dashboard {
        let mut publication = PublishRequest::new(config);
        publication.dependencies.clone_from(&report.dispatched);
        if let Err(err) = catalog.publish(&publication).await {
            error!(
                package_id = %publication.config.package_id,
                error = %err,
                "failed to send dashboard publish request"
            );
            report.dashboard_failure = Some(format!("failed to send publish request: {err}"));
        }
    }
    report
}

async fn publish_service<C, A>(
    catalog: &C,
    agent: &A,
    plan: &DispatchPlan,
    service: &DiscoveredService,
    config: &BuildConfig,
) -> Result<String, String>
where
    C: CatalogGateway,
    A: AgentGateway,
{
    let mut files = Vec::with_capacity(service.documents.len());
    for document in &service.documents {
        let content = agent
            .fetch_specification(
                &plan.agent_url,
                &plan.namespace,
                &plan.workspace_id,
                &service.id,
                &document.file_id,
            )
            .await
            .map_err(|err| format!("unable to get specification {}: {err}", service.id))?;
        files.push((document.file_id.clone(), content));
    }
    let sources =
        bundle(&files).map_err(|err| format!("unable to build sources archive: {err}"))?;

    let mut publication = PublishRequest::new(config.clone());
    publication.sources = Some(sources);
    publication.client_build = plan.client_build;
    publication.builder_id.clone_from(&plan.builder_id);
    catalog
        .publish(&publication)
        .await
        .map_err(|err| format!("failed to send publish request: {err}"))?;
    Ok(config.publish_id.clone())
}
