//! Publication requests and their build configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference from a dashboard to another package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRef {
    /// Referenced package id.
    pub ref_id: String,
    /// Referenced version.
    pub version: String,
}

/// A source file entry of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFile {
    /// Archive entry name.
    pub file_id: String,
    /// Whether the file is published.
    pub publish: bool,
    /// Labels attached to the file.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Optional API kind label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_api_kind: Option<String>,
}

/// Deployment metadata attached to a build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    /// Deployment labels rendered as `key:value`.
    #[serde(default)]
    pub version_labels: Vec<String>,
    /// Cloud the service runs in.
    #[serde(default)]
    pub cloud_name: String,
    /// Namespace the service runs in.
    #[serde(default)]
    pub namespace: String,
}

/// Build configuration sent with every publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Target package.
    pub package_id: String,
    /// Version being published.
    pub version: String,
    /// Version compared against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Package holding the previous version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_package_id: Option<String>,
    /// Status of the published version.
    pub status: String,
    /// Folder the version is filed under.
    #[serde(default)]
    pub version_folder: String,
    /// Referenced package versions, used by dashboards.
    #[serde(default)]
    pub refs: Vec<BuildRef>,
    /// Source files.
    #[serde(default)]
    pub files: Vec<BuildFile>,
    /// Publication id, assigned by the catalog.
    #[serde(default)]
    pub publish_id: String,
    /// Id of the service the build documents.
    #[serde(default)]
    pub service_id: String,
    /// Catalog URL of the published version.
    #[serde(default)]
    pub apihub_package_url: String,
    /// Principal publishing the version.
    #[serde(default)]
    pub created_by: String,
    /// Deployment metadata.
    #[serde(default)]
    pub metadata: BuildMetadata,
    /// Build kind, always `build`.
    pub build_type: String,
}

impl BuildConfig {
    /// Creates a configuration for `package_id` at `version` with `status`.
    #[must_use]
    pub fn new(
        package_id: impl Into<String>,
        version: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            version: version.into(),
            previous_version: None,
            previous_version_package_id: None,
            status: status.into(),
            version_folder: String::new(),
            refs: Vec::new(),
            files: Vec::new(),
            publish_id: String::new(),
            service_id: String::new(),
            apihub_package_url: String::new(),
            created_by: String::new(),
            metadata: BuildMetadata::default(),
            build_type: "build".to_owned(),
        }
    }
}

/// A publication submitted to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Build configuration.
    pub config: BuildConfig,
    /// Zip archive of the source files, absent for dashboards.
    pub sources: Option<Vec<u8>>,
    /// Whether the build runs on the client side.
    pub client_build: bool,
    /// Builder the client-side build is assigned to.
    pub builder_id: Option<String>,
    /// Whether the catalog keeps the uploaded sources.
    pub save_sources: bool,
    /// Publications that must finish first.
    pub dependencies: Vec<String>,
}

impl PublishRequest {
    /// Creates a request without sources or dependencies.
    #[must_use]
    pub const fn new(config: BuildConfig) -> Self {
        Self {
            config,
            sources: None,
            client_build: false,
            builder_id: None,
            save_sources: false,
            dependencies: Vec::new(),
        }
    }
}

/// Progress of one publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Waiting for a builder.
    None,
    /// Being built.
    Running,
    /// Published.
    Complete,
    /// Rejected by the catalog.
    Error,
    /// A state this client does not know.
    #[serde(other)]
    Unknown,
}

impl PublishState {
    /// Returns whether the publication reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Unknown => "unknown",
        })
    }
}

/// Status entry of one publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    /// Publication id.
    pub publish_id: String,
    /// Current state.
    pub status: PublishState,
    /// Diagnostic message, populated on errors.
    #[serde(default)]
    pub message: String,
}
