//! Package id arithmetic and the snapshot tree layout.

mod ids;
mod tree;

pub use ids::{ordered_parent_ids, parent_package_id, to_id};
pub use tree::{SNAPSHOT_DASHBOARD_NAME, SnapshotTree};
