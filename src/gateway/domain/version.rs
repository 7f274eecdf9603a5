//! Published versions, change counters, and dashboard references.

use super::non_empty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Version status names understood by the catalog.
pub struct VersionStatus;

impl VersionStatus {
    /// Unreleased version.
    pub const DRAFT: &'static str = "draft";
}

/// API type names, in comparison priority order.
pub struct ApiType;

impl ApiType {
    /// REST APIs.
    pub const REST: &'static str = "rest";
    /// `GraphQL` APIs.
    pub const GRAPHQL: &'static str = "graphql";
    /// Protobuf APIs.
    pub const PROTOBUF: &'static str = "protobuf";

    /// Picks the API type used for comparison links.
    ///
    /// REST wins over `GraphQL`, which wins over protobuf. Matching is case
    /// insensitive.
    #[must_use]
    pub fn select_default<'a, I>(api_types: I) -> Option<&'static str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: Vec<String> = api_types
            .into_iter()
            .map(str::to_ascii_lowercase)
            .collect();
        [Self::REST, Self::GRAPHQL, Self::PROTOBUF]
            .into_iter()
            .find(|candidate| present.iter().any(|api_type| api_type == candidate))
    }
}

/// Counters of classified changes between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Breaking changes.
    #[serde(default)]
    pub breaking: u32,
    /// Semi-breaking changes.
    #[serde(rename = "semi-breaking", default)]
    pub semi_breaking: u32,
    /// Deprecations.
    #[serde(default)]
    pub deprecated: u32,
    /// Non-breaking changes.
    #[serde(rename = "non-breaking", default)]
    pub non_breaking: u32,
    /// Annotation-only changes.
    #[serde(default)]
    pub annotation: u32,
    /// Unclassified changes.
    #[serde(default)]
    pub unclassified: u32,
}

impl AddAssign for ChangeSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.breaking += rhs.breaking;
        self.semi_breaking += rhs.semi_breaking;
        self.deprecated += rhs.deprecated;
        self.non_breaking += rhs.non_breaking;
        self.annotation += rhs.annotation;
        self.unclassified += rhs.unclassified;
    }
}

/// Per-API-type summary attached to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTypeSummary {
    /// API type name.
    pub api_type: String,
    /// Changes for this API type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_summary: Option<ChangeSummary>,
}

/// Detail of one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionContent {
    /// Package the version belongs to.
    #[serde(default)]
    pub package_id: String,
    /// Version label, possibly with an `@revision` suffix.
    pub version: String,
    /// Version status, such as `draft` or `release`.
    #[serde(default)]
    pub status: String,
    /// Publication time.
    #[serde(rename = "createdAt")]
    pub published_at: DateTime<Utc>,
    /// Version this one was compared against.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Package holding the previous version.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub previous_version_package_id: Option<String>,
    /// API types present in the version.
    #[serde(default)]
    pub api_types: Vec<String>,
    /// Aggregated change counters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<ChangeSummary>,
    /// Per-API-type summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operation_types: Vec<OperationTypeSummary>,
    /// Whether a newer revision of the same version exists.
    #[serde(default)]
    pub not_latest_revision: bool,
}

impl VersionContent {
    /// Folds per-API-type summaries into `api_types` and `change_summary`.
    pub fn fold_operation_types(&mut self) {
        for operation_type in &self.operation_types {
            self.api_types.push(operation_type.api_type.clone());
            if let Some(changes) = operation_type.changes_summary {
                *self.change_summary.get_or_insert_with(ChangeSummary::default) += changes;
            }
        }
    }

    /// Returns whether the version is a draft.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::DRAFT
    }

    /// Returns the version label without its revision suffix.
    #[must_use]
    pub fn label(&self) -> &str {
        strip_revision(&self.version)
    }
}

/// Strips an `@revision` suffix from a version label.
#[must_use]
pub(crate) fn strip_revision(version: &str) -> &str {
    version.split('@').next().unwrap_or(version)
}

/// One entry of a version listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVersion {
    /// Version label.
    pub version: String,
    /// Version status.
    #[serde(default)]
    pub status: String,
    /// Publication time.
    pub created_at: DateTime<Utc>,
    /// Labels attached to the version.
    #[serde(default)]
    pub version_labels: Vec<String>,
    /// Whether a newer revision of the same version exists.
    #[serde(default)]
    pub not_latest_revision: bool,
}

/// One reference of a dashboard version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReference {
    /// Key into [`VersionReferences::packages`].
    pub package_ref: String,
    /// Key of the referencing parent, if nested.
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub parent_package_ref: Option<String>,
    /// Whether the reference is excluded from the dashboard.
    #[serde(default)]
    pub excluded: bool,
}

/// Package and version a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersionRef {
    /// Referenced package id.
    #[serde(rename = "refId")]
    pub package_id: String,
    /// Referenced package kind.
    #[serde(default)]
    pub kind: String,
    /// Referenced package name.
    #[serde(rename = "name", default)]
    pub package_name: String,
    /// Referenced version.
    pub version: String,
    /// Referenced version status.
    #[serde(default)]
    pub status: String,
    /// Whether a newer revision of the referenced version exists.
    #[serde(rename = "notLatestRevision", default)]
    pub not_latest_revision: bool,
}

/// References of a dashboard version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionReferences {
    /// Reference list in dashboard order.
    #[serde(default)]
    pub references: Vec<VersionReference>,
    /// Resolved packages keyed by reference key.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageVersionRef>,
}
