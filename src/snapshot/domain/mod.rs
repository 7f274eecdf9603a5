//! Snapshot requests, outcomes and read models.

mod outcome;
mod request;
mod urls;
mod view;

pub use outcome::{DashboardPublish, DispatchHandle, DispatchReport, SnapshotOutcome};
pub use request::{CreateSnapshotRequest, InvalidVersionName, filter_services, validate_version_name};
pub use urls::{compare_url, package_overview_url};
pub use view::{ServiceWithChanges, Snapshot, SnapshotList, SnapshotListItem};
