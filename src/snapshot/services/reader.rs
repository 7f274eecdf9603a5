//! Listing and reading published snapshots.

use super::builder::SnapshotService;
use super::error::{SnapshotError, SnapshotResult};
use crate::gateway::domain::{
    ApiType, PackageVersionRef, VersionContent, VersionReference, strip_revision,
};
use crate::gateway::ports::{AgentGateway, CatalogGateway};
use crate::snapshot::domain::{
    ServiceWithChanges, Snapshot, SnapshotList, SnapshotListItem, compare_url,
    package_overview_url,
};
use crate::supervisor::guarded;
use futures::future::join_all;
use tracing::error;

/// A failed lookup while reading one snapshot entry, keyed by what failed.
type EntryFailure = (String, String);

/// Links of a snapshot entry to its baseline.
#[derive(Default)]
struct BaselineLinks {
    found: bool,
    version_found: bool,
    view_url: String,
    compare_url: String,
}

impl<C, A> SnapshotService<C, A>
where
    C: CatalogGateway + 'static,
    A: AgentGateway + 'static,
{
    /// Lists the versions of the snapshot dashboard of a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Catalog`] when the versions cannot be listed.
    pub async fn list_snapshots(
        &self,
        namespace: &str,
        workspace_id: &str,
        cloud_name: &str,
        page: u32,
        limit: u32,
    ) -> SnapshotResult<SnapshotList> {
        let package_id = self.tree(workspace_id, cloud_name, namespace).dashboard_id();
        let versions = self.catalog.list_versions(&package_id, page, limit).await?;
        Ok(SnapshotList {
            snapshots: versions
                .into_iter()
                .map(|version| SnapshotListItem {
                    version: version.version,
                    created_at: version.created_at,
                })
                .collect(),
            package_id,
        })
    }

    /// Reads one snapshot version with an entry per referenced service.
    ///
    /// Returns `Ok(None)` when the dashboard has no such version. References
    /// whose version is missing are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Catalog`] when the dashboard cannot be read
    /// and [`SnapshotError::Read`] listing every failed entry lookup.
    pub async fn get_snapshot(
        &self,
        namespace: &str,
        workspace_id: &str,
        version: &str,
        cloud_name: &str,
    ) -> SnapshotResult<Option<Snapshot>> {
        let dashboard_id = self.tree(workspace_id, cloud_name, namespace).dashboard_id();
        let Some(content) = self.catalog.get_version(&dashboard_id, version).await? else {
            return Ok(None);
        };
        let references = self
            .catalog
            .get_version_references(&dashboard_id, version)
            .await?
            .unwrap_or_default();

        let snapshot_version = link_version(&content.version, content.not_latest_revision);
        let entries = references.references.iter().map(|reference| {
            guarded(
                "snapshot.read_entry",
                self.service_entry(
                    workspace_id,
                    reference,
                    references.packages.get(&reference.package_ref),
                    snapshot_version,
                ),
            )
        });

        let mut services = Vec::new();
        let mut failures = Vec::new();
        for outcome in join_all(entries).await {
            match outcome {
                Ok(Ok(Some(entry))) => services.push(entry),
                Ok(Ok(None)) => {}
                Ok(Err((key, reason))) => failures.push(format!("err: {key}: {reason}")),
                Err(panicked) => failures.push(panicked.to_string()),
            }
        }
        if !failures.is_empty() {
            return Err(SnapshotError::Read(failures));
        }

        Ok(Some(Snapshot {
            view_snapshot_url: package_overview_url(&self.catalog_url, &dashboard_id, snapshot_version),
            version: content.version.clone(),
            api_types: content.api_types.clone(),
            previous_version: content.previous_version.clone(),
            published_at: content.published_at,
            services,
            not_latest_revision: content.not_latest_revision,
        }))
    }

    async fn service_entry(
        &self,
        workspace_id: &str,
        reference: &VersionReference,
        target: Option<&PackageVersionRef>,
        snapshot_link_version: &str,
    ) -> Result<Option<ServiceWithChanges>, EntryFailure> {
        let Some(target) = target else {
            return Err((
                reference.package_ref.clone(),
                "reference is not resolved".to_owned(),
            ));
        };
        let package_id = target.package_id.as_str();
        let package = self
            .catalog
            .get_package(package_id)
            .await
            .map_err(|err| (package_id.to_owned(), err.to_string()))?
            .ok_or_else(|| (package_id.to_owned(), "package not found".to_owned()))?;
        let Some(content) = self
            .catalog
            .get_version(package_id, &target.version)
            .await
            .map_err(|err| (package_id.to_owned(), err.to_string()))?
        else {
            error!(
                package_id,
                version = %target.version,
                "referenced version not found, left out of snapshot"
            );
            return Ok(None);
        };

        let links = match content.previous_version_package_id.as_deref() {
            Some(previous_package_id) => {
                self.baseline_links(target, &content, previous_package_id)
                    .await?
            }
            None => BaselineLinks {
                found: self
                    .catalog
                    .find_package_by_service_name(workspace_id, &package.name)
                    .await
                    .map_err(|err| (package.name.clone(), err.to_string()))?
                    .is_some(),
                ..BaselineLinks::default()
            },
        };

        Ok(Some(ServiceWithChanges {
            id: package.alias.to_lowercase(),
            package_id: package_id.to_owned(),
            previous_version_package_id: content.previous_version_package_id.clone(),
            changes: content.change_summary.unwrap_or_default(),
            api_types: content.api_types.clone(),
            view_changes_url: links.compare_url,
            view_snapshot_url: package_overview_url(
                &self.catalog_url,
                package_id,
                snapshot_link_version,
            ),
            view_baseline_url: links.view_url,
            baseline_found: links.found,
            baseline_version_found: links.version_found,
        }))
    }

    async fn baseline_links(
        &self,
        target: &PackageVersionRef,
        content: &VersionContent,
        previous_package_id: &str,
    ) -> Result<BaselineLinks, EntryFailure> {
        let mut links = BaselineLinks {
            found: true,
            ..BaselineLinks::default()
        };
        let Some(previous_version) = content.previous_version.as_deref() else {
            return Ok(links);
        };
        links.version_found = true;
        let previous_label = strip_revision(previous_version);
        links.view_url = package_overview_url(&self.catalog_url, previous_package_id, previous_label);

        let previous = self
            .catalog
            .get_version(previous_package_id, previous_version)
            .await
            .map_err(|err| {
                error!(
                    package_id = previous_package_id,
                    version = previous_version,
                    error = %err,
                    "previous version lookup failed, comparison link dropped"
                );
                (previous_version.to_owned(), err.to_string())
            })?;
        if let Some(previous) = previous {
            let api_types = content.api_types.iter().chain(&previous.api_types);
            if let Some(api_type) = ApiType::select_default(api_types.map(String::as_str)) {
                links.compare_url = compare_url(
                    &self.catalog_url,
                    &target.package_id,
                    link_version(&target.version, target.not_latest_revision),
                    api_type,
                    previous_package_id,
                    previous_label,
                );
            }
        }
        Ok(links)
    }
}

/// Returns the version used in portal links: the bare label for the latest
/// revision, the full `label@revision` otherwise.
fn link_version(version: &str, not_latest_revision: bool) -> &str {
    if not_latest_revision {
        version
    } else {
        strip_revision(version)
    }
}
