//! Tests for request validation, filtering and portal links.

use crate::gateway::domain::{DiscoveredService, DocumentType, ServiceDocument};
use crate::snapshot::domain::{
    DispatchReport, compare_url, filter_services, package_overview_url, validate_version_name,
};
use rstest::rstest;

fn documented(id: &str) -> DiscoveredService {
    DiscoveredService::new(id, id).with_document(ServiceDocument::new(
        format!("{id}.json"),
        DocumentType::OPENAPI_3_0,
    ))
}

fn ids(services: &[DiscoveredService]) -> Vec<&str> {
    services.iter().map(|service| service.id.as_str()).collect()
}

#[rstest]
#[case("2024.1", true)]
#[case("release-7", true)]
#[case("2024.1@3", false)]
fn version_labels(#[case] version: &str, #[case] accepted: bool) {
    assert_eq!(validate_version_name(version).is_ok(), accepted);
}

#[rstest]
fn rejected_label_message() {
    let err = validate_version_name("v@1").expect_err("label should be rejected");
    assert_eq!(
        err.to_string(),
        "Version name 'v@1' contains restricted characters ('@')"
    );
}

#[rstest]
fn undocumented_services_are_dropped() {
    let services = vec![documented("a"), DiscoveredService::new("b", "b")];

    let kept = filter_services(services, &[], false);

    assert_eq!(ids(&kept), vec!["a"]);
}

#[rstest]
fn selection_restricts_services() {
    let services = vec![documented("a"), documented("b"), documented("c")];

    let kept = filter_services(services, &["c".to_owned(), "a".to_owned()], false);

    assert_eq!(ids(&kept), vec!["a", "c"]);
}

#[rstest]
fn promotion_requires_baseline() {
    let services = vec![
        documented("a").with_baseline("WS.A", vec!["1.0".to_owned()]),
        documented("b"),
        documented("c").with_baseline("", Vec::new()),
    ];

    let kept = filter_services(services, &[], true);

    assert_eq!(ids(&kept), vec!["a"]);
}

#[rstest]
fn portal_links_escape_versions() {
    assert_eq!(
        package_overview_url("https://hub", "WS.PKG", "2024 1"),
        "https://hub/portal/packages/WS.PKG/2024%201/overview/summary"
    );
    assert_eq!(
        compare_url("https://hub", "WS.PKG", "v2", "rest", "WS.BASE", "v1/rc"),
        "https://hub/portal/packages/WS.PKG/v2/compare?apiType=rest&package=WS.BASE&version=v1%2Frc"
    );
}

#[rstest]
fn report_degradation() {
    let mut report = DispatchReport::default();
    assert!(!report.is_degraded());

    report
        .excluded_services
        .insert("a".to_owned(), "boom".to_owned());
    assert!(report.is_degraded());
}
