//! Mirrors service packages, and the groups above them, from one workspace
//! into another.

use crate::gateway::domain::{CatalogPackage, PackageCreateRequest, PackageKind};
use crate::gateway::ports::{CatalogGateway, CatalogGatewayError};
use crate::hierarchy::domain::{ordered_parent_ids, parent_package_id};
use crate::supervisor::guarded;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors returned by [`StructureReplicator::replicate_structure`].
#[derive(Debug, Clone, Error)]
pub enum ReplicationError {
    /// Looking up packages or staging their ancestors failed.
    #[error("failed to calculate service packages to copy: {}", .0.join(", "))]
    Plan(Vec<String>),

    /// The product group could not be looked up.
    #[error("failed to get apihub package {package_id}: {source}")]
    ProductLookup {
        /// Product group id.
        package_id: String,
        /// Catalog failure.
        source: CatalogGatewayError,
    },

    /// The product group id is taken by a node that is not a group.
    #[error(
        "unable to copy service packages from '{source_workspace}' to '{target_workspace}' workspace: package '{package_id}' has invalid package type"
    )]
    InvalidProductGroup {
        /// Workspace packages are copied from.
        source_workspace: String,
        /// Workspace packages are copied into.
        target_workspace: String,
        /// Product group id.
        package_id: String,
    },

    /// A staged group could not be created.
    #[error(
        "unable to copy service packages from '{source_workspace}' to '{target_workspace}' workspace: failed to create '{package_id}' group: {source}"
    )]
    GroupCreation {
        /// Workspace packages are copied from.
        source_workspace: String,
        /// Workspace packages are copied into.
        target_workspace: String,
        /// Id of the group that failed.
        package_id: String,
        /// Catalog failure.
        source: CatalogGatewayError,
    },

    /// One or more leaf packages could not be created.
    #[error("failed to copy service packages: {}", .0.join(", "))]
    LeafCreation(Vec<String>),
}

/// Result type for structure replication.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Nodes created by one replication run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Groups created, parents first.
    pub created_groups: Vec<String>,
    /// Service packages created.
    pub created_packages: Vec<String>,
}

impl ReplicationReport {
    /// Returns whether the run created nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created_groups.is_empty() && self.created_packages.is_empty()
    }
}

/// State shared by the concurrent branches of one run.
#[derive(Debug, Default)]
struct ReplicationScope {
    candidates: Vec<CatalogPackage>,
    seen: BTreeSet<String>,
    groups: Vec<PackageCreateRequest>,
    leaves: Vec<PackageCreateRequest>,
    errors: BTreeSet<String>,
}

/// One replication run: its parameters plus the scope its branches share.
struct Replication<'a> {
    source: &'a str,
    target: &'a str,
    default_role: &'a str,
    scope: Mutex<ReplicationScope>,
}

impl Replication<'_> {
    fn with_scope<T>(&self, change: impl FnOnce(&mut ReplicationScope) -> T) -> T {
        let mut scope = self.scope.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut scope)
    }

    fn record_error(&self, message: String) {
        self.with_scope(|scope| scope.errors.insert(message));
    }

    fn take_errors(&self) -> Vec<String> {
        self.with_scope(|scope| std::mem::take(&mut scope.errors).into_iter().collect())
    }
}

/// Copies the package structure of service packages between workspaces.
#[derive(Clone)]
pub struct StructureReplicator<G>
where
    G: CatalogGateway,
{
    catalog: Arc<G>,
}

impl<G> StructureReplicator<G>
where
    G: CatalogGateway,
{
    /// Creates a replicator over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<G>) -> Self {
        Self { catalog }
    }

    /// Ensures every service in `service_names` that has a package below
    /// `source` also has one below `target`, under the same chain of groups.
    ///
    /// The mirrored tree is rooted at the `<target>.<source>` product group.
    /// Services already documented in `target` are skipped. Nothing is
    /// created unless every lookup succeeded; groups are then created
    /// parents first, followed by every leaf package concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError`] when a lookup fails, when an existing
    /// node has the wrong kind, when a source ancestor is missing, or when a
    /// creation fails. Nodes created before the failure are kept.
    pub async fn replicate_structure(
        &self,
        source: &str,
        target: &str,
        service_names: &[String],
        default_role: &str,
    ) -> ReplicationResult<ReplicationReport> {
        let run = Replication {
            source,
            target,
            default_role,
            scope: Mutex::new(ReplicationScope::default()),
        };

        let lookups = service_names.iter().map(|name| {
            guarded("replication.lookup", self.collect_candidate(&run, name))
        });
        for outcome in join_all(lookups).await {
            if let Err(panicked) = outcome {
                run.record_error(panicked.to_string());
            }
        }
        let errors = run.take_errors();
        if !errors.is_empty() {
            return Err(ReplicationError::Plan(errors));
        }

        let candidates = run.with_scope(|scope| std::mem::take(&mut scope.candidates));
        if candidates.is_empty() {
            debug!(source, target, "no service packages to copy");
            return Ok(ReplicationReport::default());
        }

        self.stage_product_group(&run).await?;

        let staging = candidates
            .into_iter()
            .map(|package| guarded("replication.stage", self.stage_package(&run, package)));
        for outcome in join_all(staging).await {
            if let Err(panicked) = outcome {
                run.record_error(panicked.to_string());
            }
        }
        let errors = run.take_errors();
        if !errors.is_empty() {
            return Err(ReplicationError::Plan(errors));
        }

        let (mut groups, leaves) =
            run.with_scope(|scope| (std::mem::take(&mut scope.groups), std::mem::take(&mut scope.leaves)));
        groups.sort_by_key(|group| group.package_id().matches('.').count());

        let mut report = ReplicationReport::default();
        for group in &groups {
            let package_id = group.package_id();
            self.catalog.create_package(group).await.map_err(|err| {
                ReplicationError::GroupCreation {
                    source_workspace: source.to_owned(),
                    target_workspace: target.to_owned(),
                    package_id: package_id.clone(),
                    source: err,
                }
            })?;
            info!(package_id, "created group");
            report.created_groups.push(package_id);
        }

        let creations = leaves
            .iter()
            .map(|leaf| guarded("replication.create", self.create_leaf(&run, leaf)));
        for outcome in join_all(creations).await {
            match outcome {
                Ok(Some(package_id)) => report.created_packages.push(package_id),
                Ok(None) => {}
                Err(panicked) => run.record_error(panicked.to_string()),
            }
        }
        let errors = run.take_errors();
        if !errors.is_empty() {
            return Err(ReplicationError::LeafCreation(errors));
        }
        Ok(report)
    }

    async fn collect_candidate(&self, run: &Replication<'_>, service_name: &str) {
        let existing = self
            .catalog
            .find_package_by_service_name(run.target, service_name)
            .await;
        match existing {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(err) => {
                run.record_error(format!("failed to get apihub package by service name: {err}"));
                return;
            }
        }
        match self
            .catalog
            .find_package_by_service_name(run.source, service_name)
            .await
        {
            Ok(Some(package)) => run.with_scope(|scope| scope.candidates.push(package)),
            Ok(None) => {}
            Err(err) => {
                run.record_error(format!("failed to get apihub package by service name: {err}"));
            }
        }
    }

    async fn stage_product_group(&self, run: &Replication<'_>) -> ReplicationResult<()> {
        let product_id = format!("{}.{}", run.target, run.source);
        let existing = self
            .catalog
            .get_package(&product_id)
            .await
            .map_err(|err| ReplicationError::ProductLookup {
                package_id: product_id.clone(),
                source: err,
            })?;
        match existing {
            None => {
                let request = PackageCreateRequest::new(
                    run.target,
                    PackageKind::Group,
                    format!("{} Product", run.source),
                    run.source,
                )
                .with_description(format!(
                    "Group to sync packages from '{}' workspace during service discovery",
                    run.source
                ))
                .with_default_role(run.default_role);
                debug!(package_id = %product_id, "staged product group");
                run.with_scope(|scope| scope.groups.push(request));
            }
            Some(package) if package.kind != PackageKind::Group => {
                return Err(ReplicationError::InvalidProductGroup {
                    source_workspace: run.source.to_owned(),
                    target_workspace: run.target.to_owned(),
                    package_id: product_id,
                });
            }
            Some(_) => {}
        }
        run.with_scope(|scope| scope.seen.insert(product_id));
        Ok(())
    }

    async fn stage_package(&self, run: &Replication<'_>, package: CatalogPackage) {
        let mirror_id = format!("{}.{}", run.target, package.id);
        match self.catalog.get_package(&mirror_id).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                run.record_error(format!(
                    "unable to copy '{}' package from '{}' to '{}' workspace: package with id='{mirror_id}' and different serviceName already exists",
                    package.id, run.source, run.target
                ));
                return;
            }
            Err(err) => {
                run.record_error(format!("failed to get apihub package by id: {err}"));
                return;
            }
        }

        for ancestor in ordered_parent_ids(&package.id) {
            if !self.stage_ancestor(run, &package.id, &ancestor).await {
                return;
            }
        }

        let leaf = PackageCreateRequest::mirroring(parent_package_id(&mirror_id), &package)
            .with_default_role(run.default_role)
            .with_service_name(package.service_name.clone().unwrap_or_default());
        debug!(package_id = %mirror_id, "staged service package");
        run.with_scope(|scope| scope.leaves.push(leaf));
    }

    /// Stages the mirror of `ancestor` when it is missing in the target.
    ///
    /// Returns `false` once an error was recorded for the branch.
    async fn stage_ancestor(&self, run: &Replication<'_>, leaf_id: &str, ancestor: &str) -> bool {
        let mirror_id = format!("{}.{ancestor}", run.target);
        if run.with_scope(|scope| scope.seen.contains(&mirror_id)) {
            return true;
        }
        let existing = match self.catalog.get_package(&mirror_id).await {
            Ok(existing) => existing,
            Err(err) => {
                run.record_error(format!("failed to get apihub package by id: {err}"));
                return false;
            }
        };
        match existing {
            Some(package) if package.kind != PackageKind::Group => {
                run.record_error(format!(
                    "unable to copy service packages from '{}' to '{}' workspace: package '{mirror_id}' has invalid package type",
                    run.source, run.target
                ));
                false
            }
            Some(_) => {
                run.with_scope(|scope| scope.seen.insert(mirror_id));
                true
            }
            None => self.stage_missing_ancestor(run, leaf_id, ancestor, mirror_id).await,
        }
    }

    async fn stage_missing_ancestor(
        &self,
        run: &Replication<'_>,
        leaf_id: &str,
        ancestor: &str,
        mirror_id: String,
    ) -> bool {
        let original = match self.catalog.get_package(ancestor).await {
            Ok(Some(original)) => original,
            Ok(None) => {
                run.record_error(format!(
                    "unable to copy parents structure for '{leaf_id}' package: parent package '{ancestor}' doesn't exist"
                ));
                return false;
            }
            Err(err) => {
                run.record_error(format!("failed to get apihub package by id: {err}"));
                return false;
            }
        };
        let mut request = PackageCreateRequest::mirroring(parent_package_id(&mirror_id), &original)
            .with_default_role(run.default_role);
        request.kind = PackageKind::Group;
        run.with_scope(|scope| {
            if scope.seen.insert(mirror_id.clone()) {
                debug!(package_id = %mirror_id, "staged group");
                scope.groups.push(request);
            }
        });
        true
    }

    async fn create_leaf(&self, run: &Replication<'_>, leaf: &PackageCreateRequest) -> Option<String> {
        match self.catalog.create_package(leaf).await {
            Ok(package_id) => {
                info!(package_id, "created service package");
                Some(package_id)
            }
            Err(err) => {
                run.record_error(format!(
                    "unable to copy service packages from '{}' to '{}' workspace: failed to create '{}' package: {err}",
                    run.source,
                    run.target,
                    leaf.package_id()
                ));
                None
            }
        }
    }
}
