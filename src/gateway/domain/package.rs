//! Catalog packages and package creation requests.

use super::non_empty;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a catalog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// A publishable package.
    Package,
    /// A container of other nodes.
    Group,
    /// A package that aggregates other packages at one version.
    Dashboard,
    /// A top-level scope.
    Workspace,
}

impl PackageKind {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Group => "group",
            Self::Dashboard => "dashboard",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog node as returned by package lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPackage {
    /// Dotted package id.
    #[serde(rename = "packageId")]
    pub id: String,
    /// Last segment of the id.
    pub alias: String,
    /// Id of the parent node, empty for workspaces.
    #[serde(default)]
    pub parent_id: String,
    /// Node kind.
    pub kind: PackageKind,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Name of the deployed service a package documents.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Image shown next to the node.
    #[serde(default)]
    pub image_url: String,
    /// Role granted to workspace members by default.
    #[serde(default)]
    pub default_role: String,
    /// Pattern release versions must follow.
    #[serde(default)]
    pub release_version_pattern: String,
}

/// Payload creating a catalog node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCreateRequest {
    /// Id of the parent node.
    pub parent_id: String,
    /// Node kind.
    pub kind: PackageKind,
    /// Display name.
    pub name: String,
    /// Last id segment of the new node.
    pub alias: String,
    /// Free-text description.
    pub description: String,
    /// Deployed service the package documents, empty for snapshot packages.
    pub service_name: String,
    /// Image shown next to the node.
    pub image_url: String,
    /// Role granted to workspace members by default.
    pub default_role: String,
    /// Pattern release versions must follow.
    pub release_version_pattern: String,
    /// Hides the node from catalog search.
    pub exclude_from_search: Option<bool>,
}

impl PackageCreateRequest {
    /// Creates a request with the mandatory fields and empty metadata.
    #[must_use]
    pub fn new(
        parent_id: impl Into<String>,
        kind: PackageKind,
        name: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            kind,
            name: name.into(),
            alias: alias.into(),
            description: String::new(),
            service_name: String::new(),
            image_url: String::new(),
            default_role: String::new(),
            release_version_pattern: String::new(),
            exclude_from_search: None,
        }
    }

    /// Copies display metadata from an existing node.
    #[must_use]
    pub fn mirroring(parent_id: impl Into<String>, source: &CatalogPackage) -> Self {
        Self {
            parent_id: parent_id.into(),
            kind: source.kind,
            name: source.name.clone(),
            alias: source.alias.clone(),
            description: source.description.clone(),
            service_name: String::new(),
            image_url: source.image_url.clone(),
            default_role: String::new(),
            release_version_pattern: source.release_version_pattern.clone(),
            exclude_from_search: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Sets the default role.
    #[must_use]
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Hides the node from catalog search.
    #[must_use]
    pub const fn excluded_from_search(mut self) -> Self {
        self.exclude_from_search = Some(true);
        self
    }

    /// Returns the id the catalog assigns to the created node.
    #[must_use]
    pub fn package_id(&self) -> String {
        format!("{}.{}", self.parent_id, self.alias)
    }
}
