//! Provisions the group tree, dashboard and packages that receive a
//! namespace snapshot.

use crate::error::ErrorCode;
use crate::gateway::domain::{
    CatalogPackage, DiscoveredService, PackageCreateRequest, PackageKind,
};
use crate::gateway::ports::{CatalogGateway, CatalogGatewayError};
use crate::hierarchy::domain::{SNAPSHOT_DASHBOARD_NAME, SnapshotTree, parent_package_id, to_id};
use crate::supervisor::{UnitPanicked, guarded};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Default role of the groups created above the cloud group.
const HIERARCHY_DEFAULT_ROLE: &str = "editor";

/// Errors raised while provisioning a snapshot tree.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// A catalog lookup failed.
    #[error("unable to get package {package_id}: {source}")]
    Lookup {
        /// Id that was looked up.
        package_id: String,
        /// Catalog failure.
        source: CatalogGatewayError,
    },

    /// A node exists with a kind other than the one required.
    #[error("package {package_id} exists but is not a {expected} (kind: {actual})")]
    WrongKind {
        /// Id of the offending node.
        package_id: String,
        /// Kind the tree requires.
        expected: PackageKind,
        /// Kind found in the catalog.
        actual: PackageKind,
    },

    /// The workspace the tree hangs from does not exist.
    #[error("workspace {0} does not exist")]
    MissingWorkspace(String),

    /// A group the dashboard hangs from does not exist.
    #[error("group with id {0} doesn't exist")]
    MissingGroup(String),

    /// Creating a node failed.
    #[error("unable to create {package_id}: {source}")]
    Creation {
        /// Id of the node that failed.
        package_id: String,
        /// Catalog failure.
        source: CatalogGatewayError,
    },

    /// A concurrently prepared package panicked.
    #[error(transparent)]
    Interrupted(#[from] UnitPanicked),
}

impl ProvisionError {
    /// Returns the caller-facing code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Lookup { source, .. } | Self::Creation { source, .. } => source.code(),
            Self::MissingWorkspace(_) => Some(ErrorCode::WorkspaceNotFound),
            Self::WrongKind { .. } | Self::MissingGroup(_) | Self::Interrupted(_) => None,
        }
    }
}

/// Result type for snapshot tree provisioning.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Creates the catalog nodes a snapshot publishes into.
///
/// Every step checks for the node first and creates it only when missing,
/// so provisioning the same tree twice is safe.
pub struct SnapshotTreeProvisioner<G>
where
    G: CatalogGateway,
{
    catalog: Arc<G>,
}

impl<G> Clone for SnapshotTreeProvisioner<G>
where
    G: CatalogGateway,
{
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<G> SnapshotTreeProvisioner<G>
where
    G: CatalogGateway,
{
    /// Creates a provisioner over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<G>) -> Self {
        Self { catalog }
    }

    /// Ensures the namespace group of `tree` exists and returns its id.
    ///
    /// Missing ancestors are created on the way: the snapshots root below
    /// the workspace, then the cloud group.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when a lookup or creation fails, when the
    /// workspace is missing, or when a node on the path has the wrong kind.
    pub async fn prepare_namespace_group(&self, tree: &SnapshotTree) -> ProvisionResult<String> {
        let group_id = tree.namespace_group_id();
        if let Some(existing) = self.lookup(&group_id).await? {
            ensure_kind(&group_id, PackageKind::Group, existing.kind)?;
            return Ok(group_id);
        }

        let root_id = tree.snapshots_root_id();
        match self.lookup(&root_id).await? {
            None => self.create_group_hierarchy(&root_id).await?,
            Some(root) => ensure_kind(&root_id, PackageKind::Group, root.kind)?,
        }

        let cloud_group = PackageCreateRequest::new(
            root_id,
            PackageKind::Group,
            tree.cloud_name(),
            tree.cloud_alias(),
        );
        self.create_group_if_required(&cloud_group).await?;

        let namespace_group = PackageCreateRequest::new(
            tree.cloud_group_id(),
            PackageKind::Group,
            tree.namespace(),
            tree.namespace_alias(),
        );
        self.create(&namespace_group).await
    }

    /// Creates every missing segment of `package_id` as a hidden group.
    ///
    /// The first segment names the workspace, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingWorkspace`] when the first segment is
    /// unknown, and lookup, kind or creation errors for the other segments.
    pub async fn create_group_hierarchy(&self, package_id: &str) -> ProvisionResult<()> {
        let mut segments = package_id.split('.');
        let Some(workspace_id) = segments.next() else {
            return Ok(());
        };
        if self.lookup(workspace_id).await?.is_none() {
            return Err(ProvisionError::MissingWorkspace(workspace_id.to_owned()));
        }

        let mut parent_id = workspace_id.to_owned();
        for segment in segments {
            let request = PackageCreateRequest::new(&parent_id, PackageKind::Group, segment, segment)
                .with_default_role(HIERARCHY_DEFAULT_ROLE)
                .excluded_from_search();
            parent_id = self.create_group_if_required(&request).await?;
        }
        Ok(())
    }

    /// Creates the group described by `request` unless it exists.
    ///
    /// Returns the group id in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::WrongKind`] when the id is taken by a node
    /// that is not a group, and lookup or creation errors otherwise.
    pub async fn create_group_if_required(
        &self,
        request: &PackageCreateRequest,
    ) -> ProvisionResult<String> {
        let package_id = request.package_id();
        match self.lookup(&package_id).await? {
            Some(existing) => {
                ensure_kind(&package_id, PackageKind::Group, existing.kind)?;
                Ok(package_id)
            }
            None => self.create(request).await,
        }
    }

    /// Ensures the snapshot dashboard of `tree` exists and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingGroup`] when the namespace group is
    /// absent, and kind, lookup or creation errors otherwise.
    pub async fn prepare_dashboard(&self, tree: &SnapshotTree) -> ProvisionResult<String> {
        let group_id = tree.namespace_group_id();
        let Some(group) = self.lookup(&group_id).await? else {
            return Err(ProvisionError::MissingGroup(group_id));
        };
        ensure_kind(&group_id, PackageKind::Group, group.kind)?;

        let dashboard_id = tree.dashboard_id();
        if let Some(existing) = self.lookup(&dashboard_id).await? {
            ensure_kind(&dashboard_id, PackageKind::Dashboard, existing.kind)?;
            return Ok(dashboard_id);
        }
        let request = PackageCreateRequest::new(
            group_id,
            PackageKind::Dashboard,
            SNAPSHOT_DASHBOARD_NAME,
            SnapshotTree::dashboard_alias(),
        );
        self.create(&request).await
    }

    /// Ensures one package per service exists below the namespace group.
    ///
    /// Services are prepared concurrently; the ids are returned in input
    /// order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError`] raised by any service.
    pub async fn prepare_packages(
        &self,
        tree: &SnapshotTree,
        services: &[DiscoveredService],
    ) -> ProvisionResult<Vec<String>> {
        let group_id = tree.namespace_group_id();
        let preparations = services.iter().map(|service| {
            guarded(
                "snapshot.prepare_package",
                self.prepare_package(&group_id, service),
            )
        });
        join_all(preparations)
            .await
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(|panicked| Err(panicked.into())))
            .collect()
    }

    async fn prepare_package(
        &self,
        group_id: &str,
        service: &DiscoveredService,
    ) -> ProvisionResult<String> {
        let request = PackageCreateRequest::new(
            group_id,
            PackageKind::Package,
            service.name.as_str(),
            to_id(&service.id),
        );
        let package_id = request.package_id();
        match self.lookup(&package_id).await? {
            Some(existing) if existing.kind != PackageKind::Package => {
                Err(ProvisionError::WrongKind {
                    package_id: service.id.clone(),
                    expected: PackageKind::Package,
                    actual: existing.kind,
                })
            }
            Some(_) => Ok(package_id),
            None => self.create(&request).await,
        }
    }

    async fn lookup(&self, package_id: &str) -> ProvisionResult<Option<CatalogPackage>> {
        self.catalog
            .get_package(package_id)
            .await
            .map_err(|err| ProvisionError::Lookup {
                package_id: package_id.to_owned(),
                source: err,
            })
    }

    async fn create(&self, request: &PackageCreateRequest) -> ProvisionResult<String> {
        let package_id = self
            .catalog
            .create_package(request)
            .await
            .map_err(|err| ProvisionError::Creation {
                package_id: request.package_id(),
                source: err,
            })?;
        info!(
            package_id,
            parent_id = parent_package_id(&package_id),
            kind = %request.kind,
            "created snapshot node"
        );
        Ok(package_id)
    }
}

fn ensure_kind(
    package_id: &str,
    expected: PackageKind,
    actual: PackageKind,
) -> ProvisionResult<()> {
    if expected == actual {
        return Ok(());
    }
    Err(ProvisionError::WrongKind {
        package_id: package_id.to_owned(),
        expected,
        actual,
    })
}
