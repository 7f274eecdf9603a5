//! Ids of the nodes that hold the snapshots of one namespace.

use super::ids::to_id;

/// Display name of every snapshot dashboard.
pub const SNAPSHOT_DASHBOARD_NAME: &str = "snapshot";

/// Alias source of the snapshot dashboard.
const SNAPSHOT_DASHBOARD_ALIAS: &str = "snapshot-dash";

/// The snapshot tree of one namespace:
/// `<workspace>.<snapshots alias>.<CLOUD>.<NAMESPACE>` with a dashboard and
/// one package per service below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTree {
    workspace_id: String,
    snapshots_alias: String,
    cloud_name: String,
    namespace: String,
}

impl SnapshotTree {
    /// Describes the tree of `namespace` in `cloud_name` below `workspace_id`.
    #[must_use]
    pub fn new(
        workspace_id: impl Into<String>,
        snapshots_alias: impl Into<String>,
        cloud_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            snapshots_alias: snapshots_alias.into(),
            cloud_name: cloud_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Returns the workspace id.
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Returns the cloud display name.
    #[must_use]
    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the id of the group holding every cloud group.
    #[must_use]
    pub fn snapshots_root_id(&self) -> String {
        format!("{}.{}", self.workspace_id, self.snapshots_alias)
    }

    /// Returns the alias of the cloud group.
    #[must_use]
    pub fn cloud_alias(&self) -> String {
        to_id(&self.cloud_name)
    }

    /// Returns the id of the cloud group.
    #[must_use]
    pub fn cloud_group_id(&self) -> String {
        format!("{}.{}", self.snapshots_root_id(), self.cloud_alias())
    }

    /// Returns the alias of the namespace group.
    #[must_use]
    pub fn namespace_alias(&self) -> String {
        to_id(&self.namespace)
    }

    /// Returns the id of the namespace group.
    #[must_use]
    pub fn namespace_group_id(&self) -> String {
        format!("{}.{}", self.cloud_group_id(), self.namespace_alias())
    }

    /// Returns the alias of the dashboard.
    #[must_use]
    pub fn dashboard_alias() -> String {
        to_id(SNAPSHOT_DASHBOARD_ALIAS)
    }

    /// Returns the id of the dashboard.
    #[must_use]
    pub fn dashboard_id(&self) -> String {
        format!("{}.{}", self.namespace_group_id(), Self::dashboard_alias())
    }

    /// Returns the id of the package holding `service_id`.
    #[must_use]
    pub fn service_package_id(&self, service_id: &str) -> String {
        format!("{}.{}", self.namespace_group_id(), to_id(service_id))
    }
}
