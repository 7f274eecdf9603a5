//! Tests for dotted id helpers and the snapshot tree layout.

use crate::hierarchy::domain::{SnapshotTree, ordered_parent_ids, parent_package_id, to_id};
use rstest::rstest;

#[rstest]
#[case("orders", "ORDERS")]
#[case("my cloud", "MY-CLOUD")]
#[case("Team NS 2", "TEAM-NS-2")]
fn to_id_normalises(#[case] part: &str, #[case] expected: &str) {
    assert_eq!(to_id(part), expected);
}

#[rstest]
#[case("WS.GROUP.PKG", "WS.GROUP")]
#[case("WS", "")]
fn parent_of(#[case] package_id: &str, #[case] expected: &str) {
    assert_eq!(parent_package_id(package_id), expected);
}

#[rstest]
fn ancestors_are_shallowest_first() {
    assert_eq!(
        ordered_parent_ids("WS.A.B.LEAF"),
        vec!["WS".to_owned(), "WS.A".to_owned(), "WS.A.B".to_owned()]
    );
    assert!(ordered_parent_ids("WS").is_empty());
}

#[rstest]
fn snapshot_tree_ids() {
    let tree = SnapshotTree::new("WS", "RUNENV", "Prod Cloud", "team ns");

    assert_eq!(tree.snapshots_root_id(), "WS.RUNENV");
    assert_eq!(tree.cloud_group_id(), "WS.RUNENV.PROD-CLOUD");
    assert_eq!(tree.namespace_group_id(), "WS.RUNENV.PROD-CLOUD.TEAM-NS");
    assert_eq!(tree.dashboard_id(), "WS.RUNENV.PROD-CLOUD.TEAM-NS.SNAPSHOT-DASH");
    assert_eq!(
        tree.service_package_id("orders-api"),
        "WS.RUNENV.PROD-CLOUD.TEAM-NS.ORDERS-API"
    );
}
