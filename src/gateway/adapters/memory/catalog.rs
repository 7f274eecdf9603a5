//! In-memory catalog.

use crate::gateway::domain::{
    ApiKeyInfo, CatalogPackage, PackageCreateRequest, PackageKind, PackageVersionRef,
    PublishRequest, PublishState, PublishStatus, PublishedVersion, RestOperation, UserInfo,
    VersionContent, VersionReference, VersionReferences, strip_revision,
};
use crate::gateway::ports::{CatalogGateway, CatalogGatewayError, CatalogGatewayResult};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

#[derive(Debug, Default)]
struct CatalogState {
    packages: BTreeMap<String, CatalogPackage>,
    created: Vec<PackageCreateRequest>,
    rejected_creations: BTreeSet<String>,
    versions: BTreeMap<String, Vec<VersionContent>>,
    references: BTreeMap<(String, String), VersionReferences>,
    publications: Vec<PublishRequest>,
    statuses: BTreeMap<String, PublishStatus>,
    publish_targets: BTreeMap<String, String>,
    rejected_publications: BTreeSet<String>,
    failing_builds: BTreeMap<String, String>,
    held: bool,
    operations: BTreeMap<String, Vec<RestOperation>>,
    users: BTreeMap<String, UserInfo>,
    api_keys: BTreeMap<String, ApiKeyInfo>,
}

/// Catalog gateway double keeping every node and version in memory.
///
/// Created nodes get the id `<parent>.<alias>` and require an existing
/// parent. Publications complete immediately and register the version
/// unless builds are held or the package was told to fail.
#[derive(Clone)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates an empty catalog stamping versions with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CatalogState::default())),
            clock,
        }
    }

    fn edit<T>(&self, change: impl FnOnce(&mut CatalogState) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut state)
    }

    fn write_state(&self) -> CatalogGatewayResult<RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|err| CatalogGatewayError::transport(std::io::Error::other(err.to_string())))
    }

    /// Stores a node as is.
    pub fn insert_package(&self, package: CatalogPackage) {
        self.edit(|state| state.packages.insert(package.id.clone(), package));
    }

    /// Stores a workspace.
    pub fn add_workspace(&self, id: &str, name: &str) {
        self.insert_package(CatalogPackage {
            id: id.to_owned(),
            alias: id.to_owned(),
            parent_id: String::new(),
            kind: PackageKind::Workspace,
            name: name.to_owned(),
            description: String::new(),
            service_name: None,
            image_url: String::new(),
            default_role: "viewer".to_owned(),
            release_version_pattern: String::new(),
        });
    }

    /// Stores a node below `parent_id` and returns its id.
    #[must_use]
    pub fn add_package(
        &self,
        parent_id: &str,
        kind: PackageKind,
        alias: &str,
        name: &str,
        service_name: Option<&str>,
    ) -> String {
        let id = format!("{parent_id}.{alias}");
        self.insert_package(CatalogPackage {
            id: id.clone(),
            alias: alias.to_owned(),
            parent_id: parent_id.to_owned(),
            kind,
            name: name.to_owned(),
            description: String::new(),
            service_name: service_name.map(ToOwned::to_owned),
            image_url: String::new(),
            default_role: String::new(),
            release_version_pattern: String::new(),
        });
        id
    }

    /// Stores a published version.
    pub fn insert_version(&self, version: VersionContent) {
        self.edit(|state| {
            state
                .versions
                .entry(version.package_id.clone())
                .or_default()
                .push(version);
        });
    }

    /// Serves `operations` for every version of `package_id`.
    pub fn set_operations(&self, package_id: &str, operations: Vec<RestOperation>) {
        self.edit(|state| state.operations.insert(package_id.to_owned(), operations));
    }

    /// Stores a user.
    pub fn add_user(&self, user: UserInfo) {
        self.edit(|state| state.users.insert(user.id.clone(), user));
    }

    /// Stores an API key.
    pub fn add_api_key(&self, api_key: ApiKeyInfo) {
        self.edit(|state| state.api_keys.insert(api_key.id.clone(), api_key));
    }

    /// Makes the creation of `package_id` fail.
    pub fn reject_creation(&self, package_id: &str) {
        self.edit(|state| state.rejected_creations.insert(package_id.to_owned()));
    }

    /// Makes publications into `package_id` fail at submission.
    pub fn reject_publication(&self, package_id: &str) {
        self.edit(|state| state.rejected_publications.insert(package_id.to_owned()));
    }

    /// Makes builds of `package_id` end in the `error` state.
    pub fn fail_build(&self, package_id: &str, message: &str) {
        self.edit(|state| {
            state
                .failing_builds
                .insert(package_id.to_owned(), message.to_owned())
        });
    }

    /// Keeps every publication running until released.
    pub fn hold_builds(&self, held: bool) {
        self.edit(|state| state.held = held);
    }

    /// Returns a stored node.
    #[must_use]
    pub fn package(&self, package_id: &str) -> Option<CatalogPackage> {
        self.edit(|state| state.packages.get(package_id).cloned())
    }

    /// Returns every creation request accepted so far, in order.
    #[must_use]
    pub fn created_requests(&self) -> Vec<PackageCreateRequest> {
        self.edit(|state| state.created.clone())
    }

    /// Returns every publication submitted so far, in order.
    #[must_use]
    pub fn publications(&self) -> Vec<PublishRequest> {
        self.edit(|state| state.publications.clone())
    }
}

fn references_for(state: &CatalogState, request: &PublishRequest) -> VersionReferences {
    let mut references = VersionReferences::default();
    for build_ref in &request.config.refs {
        let key = format!("{}@{}", build_ref.ref_id, build_ref.version);
        let package = state.packages.get(&build_ref.ref_id);
        references.references.push(VersionReference {
            package_ref: key.clone(),
            parent_package_ref: None,
            excluded: false,
        });
        references.packages.insert(
            key,
            PackageVersionRef {
                package_id: build_ref.ref_id.clone(),
                kind: package.map(|found| found.kind.to_string()).unwrap_or_default(),
                package_name: package.map(|found| found.name.clone()).unwrap_or_default(),
                version: build_ref.version.clone(),
                status: request.config.status.clone(),
                not_latest_revision: false,
            },
        );
    }
    references
}

fn paged<T: Clone>(items: &[T], limit: u32, page: u32) -> Vec<T> {
    let size = usize::try_from(limit).unwrap_or(usize::MAX);
    let skip = usize::try_from(page)
        .unwrap_or(usize::MAX)
        .saturating_mul(size);
    items.iter().skip(skip).take(size).cloned().collect()
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn get_package(&self, package_id: &str) -> CatalogGatewayResult<Option<CatalogPackage>> {
        Ok(self.write_state()?.packages.get(package_id).cloned())
    }

    async fn find_package_by_service_name(
        &self,
        workspace_id: &str,
        service_name: &str,
    ) -> CatalogGatewayResult<Option<CatalogPackage>> {
        let state = self.write_state()?;
        let prefix = format!("{workspace_id}.");
        let mut matches: Vec<CatalogPackage> = state
            .packages
            .values()
            .filter(|package| package.kind == PackageKind::Package)
            .filter(|package| package.id.starts_with(&prefix))
            .filter(|package| package.service_name.as_deref() == Some(service_name))
            .cloned()
            .collect();
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(CatalogGatewayError::Ambiguous(count)),
        }
    }

    async fn create_package(&self, request: &PackageCreateRequest) -> CatalogGatewayResult<String> {
        let mut state = self.write_state()?;
        let id = request.package_id();
        if state.rejected_creations.contains(&id) {
            return Err(CatalogGatewayError::Rejected {
                status: 500,
                message: format!("failed to create package {id}"),
            });
        }
        if !state.packages.contains_key(&request.parent_id) {
            return Err(CatalogGatewayError::Rejected {
                status: 404,
                message: format!("parent package {} not found", request.parent_id),
            });
        }
        if state.packages.contains_key(&id) {
            return Err(CatalogGatewayError::Rejected {
                status: 400,
                message: format!("package {id} already exists"),
            });
        }
        let package = CatalogPackage {
            id: id.clone(),
            alias: request.alias.clone(),
            parent_id: request.parent_id.clone(),
            kind: request.kind,
            name: request.name.clone(),
            description: request.description.clone(),
            service_name: Some(request.service_name.clone()).filter(|name| !name.is_empty()),
            image_url: request.image_url.clone(),
            default_role: request.default_role.clone(),
            release_version_pattern: request.release_version_pattern.clone(),
        };
        state.packages.insert(id.clone(), package);
        state.created.push(request.clone());
        Ok(id)
    }

    async fn publish(&self, request: &PublishRequest) -> CatalogGatewayResult<String> {
        let now = self.clock.utc();
        let mut state = self.write_state()?;
        let package_id = request.config.package_id.clone();
        if state.rejected_publications.contains(&package_id) {
            return Err(CatalogGatewayError::Rejected {
                status: 500,
                message: format!("failed to build and publish package {package_id}"),
            });
        }
        let publish_id = if request.config.publish_id.is_empty() {
            format!("publish-{}", state.publications.len() + 1)
        } else {
            request.config.publish_id.clone()
        };
        state.publications.push(request.clone());
        state
            .publish_targets
            .insert(publish_id.clone(), package_id.clone());

        let (status, message) = if state.held {
            (PublishState::Running, String::new())
        } else if let Some(message) = state.failing_builds.get(&package_id) {
            (PublishState::Error, message.clone())
        } else {
            (PublishState::Complete, String::new())
        };
        state.statuses.insert(
            publish_id.clone(),
            PublishStatus {
                publish_id: publish_id.clone(),
                status,
                message,
            },
        );
        if status != PublishState::Error {
            let references = references_for(&state, request);
            let version = request.config.version.clone();
            state
                .references
                .insert((package_id.clone(), version.clone()), references);
            let versions = state.versions.entry(package_id.clone()).or_default();
            versions.retain(|existing| existing.version != version);
            versions.push(VersionContent {
                package_id,
                version,
                status: request.config.status.clone(),
                published_at: now,
                previous_version: request.config.previous_version.clone(),
                previous_version_package_id: request.config.previous_version_package_id.clone(),
                api_types: Vec::new(),
                change_summary: None,
                operation_types: Vec::new(),
                not_latest_revision: false,
            });
        }
        Ok(publish_id)
    }

    async fn publish_statuses(
        &self,
        _package_id: &str,
        publish_ids: &[String],
    ) -> CatalogGatewayResult<Vec<PublishStatus>> {
        let mut state = self.write_state()?;
        let mut statuses = Vec::with_capacity(publish_ids.len());
        for publish_id in publish_ids {
            let failure = state
                .publish_targets
                .get(publish_id)
                .and_then(|package_id| state.failing_builds.get(package_id))
                .cloned();
            let held = state.held;
            let Some(status) = state.statuses.get_mut(publish_id) else {
                continue;
            };
            if !held && status.status == PublishState::Running {
                match failure {
                    Some(message) => {
                        status.status = PublishState::Error;
                        status.message = message;
                    }
                    None => status.status = PublishState::Complete,
                }
            }
            statuses.push(status.clone());
        }
        Ok(statuses)
    }

    async fn get_version(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionContent>> {
        let state = self.write_state()?;
        let label = strip_revision(version);
        Ok(state.versions.get(package_id).and_then(|versions| {
            versions
                .iter()
                .find(|content| content.label() == label)
                .cloned()
        }))
    }

    async fn list_versions(
        &self,
        package_id: &str,
        page: u32,
        limit: u32,
    ) -> CatalogGatewayResult<Vec<PublishedVersion>> {
        let state = self.write_state()?;
        let mut versions: Vec<PublishedVersion> = state
            .versions
            .get(package_id)
            .map(|versions| {
                versions
                    .iter()
                    .map(|content| PublishedVersion {
                        version: content.version.clone(),
                        status: content.status.clone(),
                        created_at: content.published_at,
                        version_labels: Vec::new(),
                        not_latest_revision: content.not_latest_revision,
                    })
                    .collect()
            })
            .unwrap_or_default();
        versions.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        let page_size = if limit == 0 { 100 } else { limit };
        Ok(paged(&versions, page_size, page))
    }

    async fn get_version_references(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionReferences>> {
        let state = self.write_state()?;
        let key = (package_id.to_owned(), strip_revision(version).to_owned());
        Ok(state.references.get(&key).cloned())
    }

    async fn list_rest_operations(
        &self,
        package_id: &str,
        _version: &str,
        limit: u32,
        page: u32,
    ) -> CatalogGatewayResult<Vec<RestOperation>> {
        let state = self.write_state()?;
        Ok(state
            .operations
            .get(package_id)
            .map(|operations| paged(operations, limit, page))
            .unwrap_or_default())
    }

    async fn get_api_key(&self, api_key_id: &str) -> CatalogGatewayResult<Option<ApiKeyInfo>> {
        Ok(self.write_state()?.api_keys.get(api_key_id).cloned())
    }

    async fn get_user(&self, user_id: &str) -> CatalogGatewayResult<Option<UserInfo>> {
        Ok(self.write_state()?.users.get(user_id).cloned())
    }
}
