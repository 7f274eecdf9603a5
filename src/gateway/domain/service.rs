//! Services discovered by an agent and their specification documents.

use super::non_empty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespaces an agent can see, plus the cloud it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentNamespaces {
    /// Namespace names.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Cloud name reported by the agent.
    #[serde(default)]
    pub cloud_name: String,
}

impl AgentNamespaces {
    /// Returns whether `namespace` is visible to the agent.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.iter().any(|candidate| candidate == namespace)
    }
}

/// Id and name of a deployed service, as listed before discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceName {
    /// Service id.
    pub id: String,
    /// Service display name.
    pub name: String,
}

/// Progress of discovery in one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    /// Discovery was never started.
    #[default]
    None,
    /// Discovery is in progress.
    Running,
    /// Discovery finished.
    Complete,
    /// Discovery failed.
    Error,
}

impl DiscoveryStatus {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specification format tags reported by agents.
pub struct DocumentType;

impl DocumentType {
    /// `OpenAPI` 2.0.
    pub const OPENAPI_2_0: &'static str = "openapi-2-0";
    /// `OpenAPI` 3.0.
    pub const OPENAPI_3_0: &'static str = "openapi-3-0";
    /// `OpenAPI` 3.1.
    pub const OPENAPI_3_1: &'static str = "openapi-3-1";

    /// Returns whether `document_type` is any supported `OpenAPI` version.
    #[must_use]
    pub fn is_openapi(document_type: &str) -> bool {
        matches!(
            document_type,
            Self::OPENAPI_2_0 | Self::OPENAPI_3_0 | Self::OPENAPI_3_1
        )
    }
}

/// One specification document served by a discovered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDocument {
    /// Document name.
    #[serde(default)]
    pub name: String,
    /// Serialisation format, such as `json` or `yaml`.
    #[serde(default)]
    pub format: String,
    /// File id used to fetch the raw bytes and to name the archive entry.
    pub file_id: String,
    /// Specification type tag, see [`DocumentType`].
    #[serde(rename = "type", default)]
    pub document_type: String,
    /// Optional API kind label.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub x_api_kind: Option<String>,
    /// Path the agent fetched the document from.
    #[serde(default)]
    pub doc_path: String,
}

impl ServiceDocument {
    /// Creates a document of `document_type` fetched as `file_id`.
    #[must_use]
    pub fn new(file: impl Into<String>, document_type: impl Into<String>) -> Self {
        let file_id: String = file.into();
        Self {
            name: file_id.clone(),
            format: "json".to_owned(),
            doc_path: format!("/{file_id}"),
            file_id,
            document_type: document_type.into(),
            x_api_kind: None,
        }
    }
}

/// A pre-existing catalog package a service can be promoted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Baseline package id.
    pub package_id: String,
    /// Baseline package name.
    #[serde(default)]
    pub name: String,
    /// Catalog URL of the baseline.
    #[serde(default)]
    pub url: String,
    /// Versions published into the baseline.
    #[serde(default)]
    pub versions: Vec<String>,
}

/// A service discovered in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredService {
    /// Service id.
    pub id: String,
    /// Service display name.
    #[serde(rename = "serviceName", default)]
    pub name: String,
    /// In-cluster URL of the service.
    #[serde(default)]
    pub url: String,
    /// Specification documents served by the service.
    #[serde(default)]
    pub documents: Vec<ServiceDocument>,
    /// Matching baseline package, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Baseline>,
    /// Deployment labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub service_labels: BTreeMap<String, String>,
    /// Discovery error for this service, if any.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoveredService {
    /// Creates a service with no documents, labels or baseline.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: String::new(),
            documents: Vec::new(),
            baseline: None,
            service_labels: BTreeMap::new(),
            error: None,
        }
    }

    /// Adds a specification document.
    #[must_use]
    pub fn with_document(mut self, document: ServiceDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Attaches a baseline package.
    #[must_use]
    pub fn with_baseline(mut self, package_id: impl Into<String>, versions: Vec<String>) -> Self {
        self.baseline = Some(Baseline {
            package_id: package_id.into(),
            name: String::new(),
            url: String::new(),
            versions,
        });
        self
    }

    /// Returns whether any document is an `OpenAPI` specification.
    #[must_use]
    pub fn has_openapi_document(&self) -> bool {
        self.documents
            .iter()
            .any(|document| DocumentType::is_openapi(&document.document_type))
    }

    /// Returns the baseline package id when a baseline with an id is attached.
    #[must_use]
    pub fn baseline_package_id(&self) -> Option<&str> {
        self.baseline
            .as_ref()
            .map(|baseline| baseline.package_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Result of listing the services of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceList {
    /// Services found so far.
    #[serde(default)]
    pub services: Vec<DiscoveredService>,
    /// Discovery progress.
    #[serde(default)]
    pub status: DiscoveryStatus,
    /// Diagnostic text, populated when discovery fails.
    #[serde(default)]
    pub debug: String,
}
