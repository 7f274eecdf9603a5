//! The background flow of one security check.

use crate::agent::ports::AgentRegistryRepository;
use crate::config::AuditConfig;
use crate::discovery::domain::DiscoveryTarget;
use crate::discovery::services::{DiscoveryError, DiscoveryService};
use crate::gateway::domain::{
    BuildConfig, DiscoveryStatus, PublishState, PublishStatus, RestOperation, ServiceList,
    VersionStatus,
};
use crate::gateway::ports::{AgentGateway, CatalogGateway, CatalogGatewayResult};
use crate::security_check::domain::{
    EndpointResult, ProcessId, ProcessStatus, SecurityCheckProcess, ServiceCheck, ServiceStatus,
    audit_version_label,
};
use crate::security_check::ports::{AuditRepository, AuditRepositoryError};
use crate::snapshot::domain::{CreateSnapshotRequest, DispatchReport, SnapshotOutcome};
use crate::snapshot::services::{SnapshotError, SnapshotService};
use crate::supervisor::{guarded, spawn};
use async_channel::{Receiver, Sender};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

const NO_SUPPORTED_SERVICES: &str = "found 0 services with valid openapi specs";
const NO_ENDPOINTS: &str = "no endpoints found for this service";

/// Blocking failures of a pipeline. Each one ends the process in `error`.
#[derive(Debug, thiserror::Error)]
enum PipelineFailure {
    #[error(transparent)]
    DiscoveryStart(DiscoveryError),
    #[error("failed to get service discovery result: {0}")]
    DiscoveryListing(DiscoveryError),
    #[error("failed to get service discovery result: service discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("failed to get service discovery result: deadline exceeded for services discovery")]
    DiscoveryDeadline,
    #[error("failed to store services: {0}")]
    StoreServices(AuditRepositoryError),
    #[error("failed to create snapshot for discovered services: {0}")]
    Snapshot(Box<SnapshotError>),
    #[error("deadline exceeded for snapshot creation")]
    PublishDeadline,
}

/// One published service waiting for its endpoints to be probed.
#[derive(Debug, Clone)]
struct ProbeTask {
    process_id: ProcessId,
    agent_url: String,
    namespace: String,
    service_id: String,
    package_id: String,
    version: String,
}

/// What a resolved publication turns into.
enum Resolution {
    Probe(ProbeTask),
    Failed(ServiceCheck),
}

/// Drives discovery, snapshot publication and probing for a process.
pub(super) struct AuditPipeline<S, R, K, C, A>
where
    S: AuditRepository + 'static,
    R: AgentRegistryRepository + 'static,
    K: Clock + Send + Sync + 'static,
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    repository: Arc<S>,
    discovery: Arc<DiscoveryService<R, K, C, A>>,
    snapshots: SnapshotService<C, A>,
    catalog: Arc<C>,
    agent: Arc<A>,
    clock: Arc<K>,
    settings: AuditConfig,
    catalog_url: Arc<str>,
}

impl<S, R, K, C, A> Clone for AuditPipeline<S, R, K, C, A>
where
    S: AuditRepository + 'static,
    R: AgentRegistryRepository + 'static,
    K: Clock + Send + Sync + 'static,
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            discovery: Arc::clone(&self.discovery),
            snapshots: self.snapshots.clone(),
            catalog: Arc::clone(&self.catalog),
            agent: Arc::clone(&self.agent),
            clock: Arc::clone(&self.clock),
            settings: self.settings,
            catalog_url: Arc::clone(&self.catalog_url),
        }
    }
}

impl<S, R, K, C, A> AuditPipeline<S, R, K, C, A>
where
    S: AuditRepository + 'static,
    R: AgentRegistryRepository + 'static,
    K: Clock + Send + Sync + 'static,
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    pub(super) fn new(
        repository: Arc<S>,
        discovery: Arc<DiscoveryService<R, K, C, A>>,
        snapshots: SnapshotService<C, A>,
        clock: Arc<K>,
        settings: AuditConfig,
    ) -> Self {
        Self {
            repository,
            discovery,
            catalog: snapshots.catalog(),
            agent: snapshots.agent(),
            catalog_url: snapshots.catalog_url(),
            snapshots,
            clock,
            settings,
        }
    }

    /// Runs the whole check and records its terminal status.
    pub(super) async fn run(&self, mut process: SecurityCheckProcess, target: &DiscoveryTarget) {
        let process_id = process.process_id;
        let outcome = guarded("security_check.pipeline", self.drive(process_id, target)).await;
        let (status, details) = match outcome {
            Ok(Ok(details)) => (ProcessStatus::Complete, details),
            Ok(Err(failure)) => (ProcessStatus::Error, failure.to_string()),
            Err(panicked) => (ProcessStatus::Error, panicked.to_string()),
        };
        process.transition(status, details, self.clock.utc());
        if let Err(err) = self.repository.update_process(&process).await {
            error!(%process_id, error = %err, "failed to store security check process status");
        }
        info!(
            %process_id,
            status = %process.status,
            details = %process.details,
            "security check finished"
        );
    }

    async fn drive(
        &self,
        process_id: ProcessId,
        target: &DiscoveryTarget,
    ) -> Result<String, PipelineFailure> {
        self.discovery
            .trigger(target, false)
            .await
            .map_err(PipelineFailure::DiscoveryStart)?;
        let listing = self.await_discovery(target).await?;

        let rows: Vec<ServiceCheck> = listing
            .services
            .iter()
            .filter(|service| !service.documents.is_empty())
            .map(|service| {
                if service.has_openapi_document() {
                    ServiceCheck::pending(process_id, &service.id)
                } else {
                    ServiceCheck::unsupported(process_id, &service.id)
                }
            })
            .collect();
        if rows.is_empty() {
            return Ok(format!("0 services found for namespace {}", target.namespace));
        }
        self.repository
            .save_services(&rows)
            .await
            .map_err(PipelineFailure::StoreServices)?;

        let supported: Vec<String> = rows
            .iter()
            .filter(|row| row.status == ServiceStatus::None)
            .map(|row| row.service_id.clone())
            .collect();
        if supported.is_empty() {
            return Ok(NO_SUPPORTED_SERVICES.to_owned());
        }
        info!(
            %process_id,
            supported = supported.len(),
            discovered = rows.len(),
            "publishing services for security check"
        );

        let request = CreateSnapshotRequest::new(
            target.namespace.as_str(),
            target.workspace_id(),
            audit_version_label(self.clock.utc()),
            target.cloud_name.as_str(),
            target.agent_url(),
        )
        .with_services(supported)
        .with_status(VersionStatus::DRAFT);
        let outcome = self
            .snapshots
            .create_snapshot(&request)
            .await
            .map_err(|err| PipelineFailure::Snapshot(Box::new(err)))?;
        self.probe_published(process_id, target, outcome).await?;
        Ok(String::new())
    }

    async fn await_discovery(&self, target: &DiscoveryTarget) -> Result<ServiceList, PipelineFailure> {
        let started_at = Instant::now();
        loop {
            let listing = self
                .discovery
                .list_target_services(target)
                .await
                .map_err(PipelineFailure::DiscoveryListing)?;
            match listing.status {
                DiscoveryStatus::Complete => return Ok(listing),
                DiscoveryStatus::Error => return Err(PipelineFailure::DiscoveryFailed(listing.debug)),
                DiscoveryStatus::None | DiscoveryStatus::Running => {}
            }
            if started_at.elapsed() >= self.settings.discovery_deadline() {
                return Err(PipelineFailure::DiscoveryDeadline);
            }
            sleep(self.settings.discovery_poll_interval()).await;
        }
    }

    /// Polls publication statuses and feeds every published service to the
    /// probing workers, returning once each dispatched task has reported.
    async fn probe_published(
        &self,
        process_id: ProcessId,
        target: &DiscoveryTarget,
        outcome: SnapshotOutcome,
    ) -> Result<(), PipelineFailure> {
        let SnapshotOutcome {
            dashboard,
            services,
            mut dispatch,
        } = outcome;
        let dashboard_id = dashboard.map(|publish| publish.package_id).unwrap_or_default();
        let mut pending: BTreeMap<String, BuildConfig> = services
            .into_iter()
            .map(|config| (config.publish_id.clone(), config))
            .collect();

        let capacity = pending.len().max(1);
        let (task_sender, task_receiver) = async_channel::bounded::<ProbeTask>(capacity);
        let (result_sender, result_receiver) = async_channel::unbounded::<()>();
        for _ in 0..self.settings.worker_limit().min(capacity) {
            let worker = self.clone();
            let tasks = task_receiver.clone();
            let results = result_sender.clone();
            spawn("security_check.worker", async move {
                worker.drain(&tasks, &results).await;
            });
        }
        drop(task_receiver);
        drop(result_sender);

        let started_at = Instant::now();
        let mut failed: Vec<ServiceCheck> = Vec::new();
        let mut dispatched = 0_usize;
        let mut expired = false;
        loop {
            if let Some(report) = dispatch.try_report() {
                exclude_undispatched(process_id, &report, &mut pending, &mut failed);
            }
            if pending.is_empty() {
                break;
            }
            let publish_ids: Vec<String> = pending.keys().cloned().collect();
            match self.catalog.publish_statuses(&dashboard_id, &publish_ids).await {
                Ok(statuses) => {
                    for status in statuses {
                        let resolved = match status.status {
                            PublishState::Complete | PublishState::Error => {
                                pending.remove(&status.publish_id)
                            }
                            PublishState::None | PublishState::Running | PublishState::Unknown => None,
                        };
                        let Some(config) = resolved else { continue };
                        match self.resolve(process_id, target, &config, &status).await {
                            Resolution::Probe(task) => {
                                if task_sender.send(task).await.is_ok() {
                                    dispatched += 1;
                                } else {
                                    error!(%process_id, service_id = %config.service_id, "no probing worker left");
                                }
                            }
                            Resolution::Failed(row) => failed.push(row),
                        }
                    }
                }
                Err(err) => warn!(%process_id, error = %err, "failed to get publish statuses"),
            }
            if pending.is_empty() {
                break;
            }
            if started_at.elapsed() >= self.settings.publish_deadline() {
                expired = true;
                break;
            }
            sleep(self.settings.publish_poll_interval()).await;
        }
        drop(task_sender);

        if !failed.is_empty() {
            if let Err(err) = self.repository.save_services(&failed).await {
                error!(%process_id, error = %err, "failed to store failed services");
            }
        }
        for _ in 0..dispatched {
            if result_receiver.recv().await.is_err() {
                break;
            }
        }
        if expired {
            return Err(PipelineFailure::PublishDeadline);
        }
        Ok(())
    }

    async fn resolve(
        &self,
        process_id: ProcessId,
        target: &DiscoveryTarget,
        config: &BuildConfig,
        status: &PublishStatus,
    ) -> Resolution {
        if status.status == PublishState::Error {
            let details = format!("failed to publish service: {}", status.message);
            return Resolution::Failed(ServiceCheck::failed(process_id, &config.service_id, &details));
        }
        match self.start_probing(process_id, target, config).await {
            Ok(task) => Resolution::Probe(task),
            Err(details) => {
                let row = ServiceCheck::failed(
                    process_id,
                    &config.service_id,
                    &format!("failed to start service security check: {details}"),
                );
                Resolution::Failed(row)
            }
        }
    }

    async fn start_probing(
        &self,
        process_id: ProcessId,
        target: &DiscoveryTarget,
        config: &BuildConfig,
    ) -> Result<ProbeTask, String> {
        let row = ServiceCheck::probing(
            process_id,
            &config.service_id,
            &self.catalog_url,
            &config.package_id,
            &config.version,
        );
        self.repository
            .update_service(&row)
            .await
            .map_err(|err| err.to_string())?;
        let version = match self.catalog.get_version(&config.package_id, &config.version).await {
            Ok(Some(content)) => content.version,
            Ok(None) => return Err("failed to get published version".to_owned()),
            Err(err) => return Err(err.to_string()),
        };
        Ok(ProbeTask {
            process_id,
            agent_url: target.agent_url().to_owned(),
            namespace: target.namespace.clone(),
            service_id: config.service_id.clone(),
            package_id: config.package_id.clone(),
            version,
        })
    }

    async fn drain(&self, tasks: &Receiver<ProbeTask>, results: &Sender<()>) {
        while let Ok(task) = tasks.recv().await {
            if let Err(panicked) = guarded("security_check.probe_service", self.probe_service(&task)).await {
                let row = ServiceCheck::failed(task.process_id, &task.service_id, &panicked.to_string());
                self.write_service(&row).await;
            }
            if results.send(()).await.is_err() {
                debug!(service_id = %task.service_id, "probe result no longer awaited");
            }
        }
    }

    async fn probe_service(&self, task: &ProbeTask) {
        let mut row = ServiceCheck::probing(
            task.process_id,
            &task.service_id,
            &self.catalog_url,
            &task.package_id,
            &task.version,
        );
        self.write_service(&row).await;

        let operations = match self.list_operations(task).await {
            Ok(operations) => operations,
            Err(err) => {
                row.finish(
                    ServiceStatus::Failed,
                    format!("failed to retrieve service endpoints from apihub: {err}"),
                );
                self.write_service(&row).await;
                return;
            }
        };
        if operations.is_empty() {
            row.finish(ServiceStatus::Complete, NO_ENDPOINTS);
            self.write_service(&row).await;
            return;
        }
        row.endpoints_total = u32::try_from(operations.len()).unwrap_or(u32::MAX);
        self.write_service(&row).await;

        let mut results = Vec::with_capacity(operations.len());
        for operation in &operations {
            let mut result = EndpointResult::new(
                task.process_id,
                &task.service_id,
                &operation.method,
                &operation.path,
                operation.security_schemes(),
            );
            match self
                .agent
                .probe_endpoint(
                    &task.agent_url,
                    &task.namespace,
                    &task.service_id,
                    &operation.method,
                    &operation.path,
                )
                .await
            {
                Ok(code) => result.actual_response_code = Some(code),
                Err(err) => result.details = err.to_string(),
            }
            if result.is_failed() {
                row.endpoints_failed += 1;
            }
            results.push(result);
        }
        debug!(
            service_id = %task.service_id,
            total = row.endpoints_total,
            failed = row.endpoints_failed,
            "service probed"
        );

        match self.repository.save_results(&results).await {
            Ok(()) => row.finish(ServiceStatus::Complete, ""),
            Err(err) => row.finish(
                ServiceStatus::Failed,
                format!("failed to store security check results: {err}"),
            ),
        }
        self.write_service(&row).await;
    }

    /// Pages through the REST operations of the published version while
    /// pages come back full.
    async fn list_operations(&self, task: &ProbeTask) -> CatalogGatewayResult<Vec<RestOperation>> {
        let limit = self.settings.operations_page_limit();
        let page_len = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut operations = Vec::new();
        let mut page = 0;
        loop {
            let batch = self
                .catalog
                .list_rest_operations(&task.package_id, &task.version, limit, page)
                .await?;
            let full = batch.len() >= page_len;
            operations.extend(batch);
            if !full {
                return Ok(operations);
            }
            page += 1;
        }
    }

    async fn write_service(&self, row: &ServiceCheck) {
        if let Err(err) = self.repository.update_service(row).await {
            error!(
                process_id = %row.process_id,
                service_id = %row.service_id,
                status = %row.status,
                error = %err,
                "failed to store security check service"
            );
        }
    }
}

/// Moves services the snapshot never submitted out of `pending`.
fn exclude_undispatched(
    process_id: ProcessId,
    report: &DispatchReport,
    pending: &mut BTreeMap<String, BuildConfig>,
    failed: &mut Vec<ServiceCheck>,
) {
    if let Some(reason) = &report.dashboard_failure {
        warn!(%process_id, %reason, "audit dashboard was not published");
    }
    pending.retain(|_, config| match report.excluded_services.get(&config.service_id) {
        Some(reason) => {
            let details = format!("failed to dispatch publish: {reason}");
            failed.push(ServiceCheck::failed(process_id, &config.service_id, &details));
            false
        }
        None => true,
    });
}
