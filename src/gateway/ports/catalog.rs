//! Port for the API catalog.

use crate::error::ErrorCode;
use crate::gateway::domain::{
    ApiKeyInfo, CatalogPackage, PackageCreateRequest, PublishRequest, PublishStatus,
    PublishedVersion, RestOperation, UserInfo, VersionContent, VersionReferences,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for catalog gateway operations.
pub type CatalogGatewayResult<T> = Result<T, CatalogGatewayError>;

/// Calls served by the API catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Finds a catalog node by id.
    async fn get_package(&self, package_id: &str) -> CatalogGatewayResult<Option<CatalogPackage>>;

    /// Finds the package documenting `service_name` anywhere below
    /// `workspace_id`.
    ///
    /// More than one match is an error.
    async fn find_package_by_service_name(
        &self,
        workspace_id: &str,
        service_name: &str,
    ) -> CatalogGatewayResult<Option<CatalogPackage>>;

    /// Creates a catalog node and returns its id.
    async fn create_package(&self, request: &PackageCreateRequest) -> CatalogGatewayResult<String>;

    /// Submits a publication and returns its publish id.
    async fn publish(&self, request: &PublishRequest) -> CatalogGatewayResult<String>;

    /// Returns the status of each listed publication of `package_id`.
    async fn publish_statuses(
        &self,
        package_id: &str,
        publish_ids: &[String],
    ) -> CatalogGatewayResult<Vec<PublishStatus>>;

    /// Returns the detail of one version, with per-type summaries folded.
    async fn get_version(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionContent>>;

    /// Lists versions of a package, newest first.
    async fn list_versions(
        &self,
        package_id: &str,
        page: u32,
        limit: u32,
    ) -> CatalogGatewayResult<Vec<PublishedVersion>>;

    /// Returns the references of a dashboard version.
    async fn get_version_references(
        &self,
        package_id: &str,
        version: &str,
    ) -> CatalogGatewayResult<Option<VersionReferences>>;

    /// Returns one page of REST operations with their document fragments.
    async fn list_rest_operations(
        &self,
        package_id: &str,
        version: &str,
        limit: u32,
        page: u32,
    ) -> CatalogGatewayResult<Vec<RestOperation>>;

    /// Finds an API key by id.
    async fn get_api_key(&self, api_key_id: &str) -> CatalogGatewayResult<Option<ApiKeyInfo>>;

    /// Finds a user by id.
    async fn get_user(&self, user_id: &str) -> CatalogGatewayResult<Option<UserInfo>>;
}

/// Errors returned by catalog gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum CatalogGatewayError {
    /// The catalog rejected the configured credentials.
    #[error("catalog rejected credentials with status {0}")]
    Unauthorized(u16),

    /// The catalog answered with an unexpected status.
    #[error("{message}: status code {status}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// What was being attempted, plus the body when available.
        message: String,
    },

    /// A lookup expected at most one package.
    #[error("unexpected number of packages returned {0}")]
    Ambiguous(usize),

    /// The request did not reach the catalog or its answer was unreadable.
    #[error("catalog transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl CatalogGatewayError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns the caller-facing code, if the failure has one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Unauthorized(_) => Some(ErrorCode::NoCatalogAccess),
            _ => None,
        }
    }
}
