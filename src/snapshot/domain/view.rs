//! Read models of published snapshots.

use crate::gateway::domain::ChangeSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One version of a snapshot dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotListItem {
    /// Version label, with revision.
    pub version: String,
    /// Publication time.
    pub created_at: DateTime<Utc>,
}

/// Versions of the snapshot dashboard of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotList {
    /// Dashboard package id.
    pub package_id: String,
    /// Versions, newest first.
    pub snapshots: Vec<SnapshotListItem>,
}

/// A service entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWithChanges {
    /// Service id, the lower-cased package alias.
    pub id: String,
    /// Snapshot package id.
    pub package_id: String,
    /// Baseline package compared against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_package_id: Option<String>,
    /// Changes against the baseline version.
    pub changes: ChangeSummary,
    /// API types of the published version.
    pub api_types: Vec<String>,
    /// Link to the comparison with the baseline.
    pub view_changes_url: String,
    /// Link to the snapshot package version.
    pub view_snapshot_url: String,
    /// Link to the baseline version.
    pub view_baseline_url: String,
    /// Whether the service has a baseline package.
    pub baseline_found: bool,
    /// Whether the baseline has the compared version.
    pub baseline_version_found: bool,
}

/// A published snapshot with its services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Version label, with revision.
    pub version: String,
    /// API types of the dashboard version.
    pub api_types: Vec<String>,
    /// Previous dashboard version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Services in reference order.
    pub services: Vec<ServiceWithChanges>,
    /// Link to the dashboard version.
    pub view_snapshot_url: String,
    /// Whether a newer revision of the version exists.
    pub not_latest_revision: bool,
}
