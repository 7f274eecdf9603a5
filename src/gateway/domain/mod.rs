//! Wire-level domain model shared by the gateway ports and their adapters.

mod build;
mod operation;
mod package;
mod principal;
mod service;
mod version;

pub use build::{BuildConfig, BuildFile, BuildMetadata, BuildRef, PublishRequest, PublishState, PublishStatus};
pub use operation::{OperationDocument, OperationObject, PathItem, RestOperation, SecurityRequirement};
pub use package::{CatalogPackage, PackageCreateRequest, PackageKind};
pub use principal::{ApiKeyInfo, UserInfo};
pub use service::{
    AgentNamespaces, Baseline, DiscoveredService, DiscoveryStatus, DocumentType, ServiceDocument,
    ServiceList, ServiceName,
};
pub use version::{
    ApiType, ChangeSummary, OperationTypeSummary, PackageVersionRef, PublishedVersion,
    VersionContent, VersionReference, VersionReferences, VersionStatus,
};
pub(crate) use version::strip_revision;

use serde::{Deserialize, Deserializer};

/// Deserialises an optional string, mapping the empty string to `None`.
pub(crate) fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.is_empty()))
}
