//! Snapshot creation requests and the rules applied before provisioning.

use crate::gateway::domain::{DiscoveredService, VersionStatus};
use std::collections::BTreeSet;
use thiserror::Error;

/// Character separating a version label from its revision.
const REVISION_SEPARATOR: char = '@';

/// The version label contains a reserved character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Version name '{version}' contains restricted characters ('@')")]
pub struct InvalidVersionName {
    /// Rejected label.
    pub version: String,
}

/// Rejects version labels containing the revision separator.
///
/// # Errors
///
/// Returns [`InvalidVersionName`] when `version` contains `@`.
pub fn validate_version_name(version: &str) -> Result<(), InvalidVersionName> {
    if version.contains(REVISION_SEPARATOR) {
        return Err(InvalidVersionName {
            version: version.to_owned(),
        });
    }
    Ok(())
}

/// Keeps the services a snapshot can publish.
///
/// A service qualifies when it has at least one document and, if
/// `selected` is non-empty, its id is listed there. Promotion additionally
/// requires a baseline package.
#[must_use]
pub fn filter_services(
    services: Vec<DiscoveredService>,
    selected: &[String],
    promote: bool,
) -> Vec<DiscoveredService> {
    let wanted: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
    services
        .into_iter()
        .filter(|service| wanted.is_empty() || wanted.contains(service.id.as_str()))
        .filter(|service| !service.documents.is_empty())
        .filter(|service| !promote || service.baseline_package_id().is_some())
        .collect()
}

/// Parameters of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSnapshotRequest {
    /// Namespace whose services are published.
    pub namespace: String,
    /// Workspace the snapshot tree lives in.
    pub workspace_id: String,
    /// Version label.
    pub version: String,
    /// Baseline version compared against, when the baseline has it.
    pub previous_version: Option<String>,
    /// Service ids to publish. Empty selects every documented service.
    pub services: Vec<String>,
    /// Publishes into the baseline packages instead of the snapshot tree.
    pub promote: bool,
    /// Status of the per-service versions.
    pub version_status: String,
    /// Cloud the namespace runs in.
    pub cloud_name: String,
    /// URL of the agent serving the namespace.
    pub agent_url: String,
    /// Whether builds run on the client side.
    pub client_build: bool,
    /// Builder the client-side builds are assigned to.
    pub builder_id: Option<String>,
    /// Principal recorded as the publisher.
    pub created_by: String,
}

impl CreateSnapshotRequest {
    /// Creates a draft snapshot request for every documented service.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        workspace_id: impl Into<String>,
        version: impl Into<String>,
        cloud_name: impl Into<String>,
        agent_url: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            workspace_id: workspace_id.into(),
            version: version.into(),
            previous_version: None,
            services: Vec::new(),
            promote: false,
            version_status: VersionStatus::DRAFT.to_owned(),
            cloud_name: cloud_name.into(),
            agent_url: agent_url.into(),
            client_build: false,
            builder_id: None,
            created_by: String::new(),
        }
    }

    /// Restricts the snapshot to `services`.
    #[must_use]
    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }

    /// Links every service to `version` of its baseline.
    #[must_use]
    pub fn with_previous_version(mut self, version: impl Into<String>) -> Self {
        self.previous_version = Some(version.into());
        self
    }

    /// Sets the status of the published versions.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.version_status = status.into();
        self
    }

    /// Records `principal` as the publisher.
    #[must_use]
    pub fn created_by(mut self, principal: impl Into<String>) -> Self {
        self.created_by = principal.into();
        self
    }

    /// Publishes into baseline packages.
    #[must_use]
    pub const fn promoting(mut self) -> Self {
        self.promote = true;
        self
    }
}
