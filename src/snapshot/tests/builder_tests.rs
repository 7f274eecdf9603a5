//! Tests for snapshot creation and background publication.

use std::sync::Arc;

use crate::error::ErrorCode;
use crate::gateway::adapters::memory::{InMemoryCatalog, ScriptedAgent};
use crate::gateway::domain::{
    DiscoveredService, DiscoveryStatus, DocumentType, PackageKind, ServiceDocument, ServiceList,
    VersionContent,
};
use crate::snapshot::domain::CreateSnapshotRequest;
use crate::snapshot::services::{SnapshotError, SnapshotService};
use chrono::Utc;
use rstest::{fixture, rstest};

const GROUP: &str = "WS.RUNENV.PROD.TEAM";

struct Harness {
    catalog: Arc<InMemoryCatalog>,
    agent: Arc<ScriptedAgent>,
    service: SnapshotService<InMemoryCatalog, ScriptedAgent>,
}

fn documented(id: &str) -> DiscoveredService {
    let mut service = DiscoveredService::new(id, format!("{id} service")).with_document(
        ServiceDocument::new(format!("{id}.json"), DocumentType::OPENAPI_3_0),
    );
    service
        .service_labels
        .insert("team".to_owned(), "core".to_owned());
    service
}

fn listing(services: Vec<DiscoveredService>) -> ServiceList {
    ServiceList {
        services,
        status: DiscoveryStatus::Complete,
        debug: String::new(),
    }
}

fn version(package_id: &str, label: &str, status: &str) -> VersionContent {
    VersionContent {
        package_id: package_id.to_owned(),
        version: label.to_owned(),
        status: status.to_owned(),
        published_at: Utc::now(),
        previous_version: None,
        previous_version_package_id: None,
        api_types: vec!["rest".to_owned()],
        change_summary: None,
        operation_types: Vec::new(),
        not_latest_revision: false,
    }
}

fn request(version_label: &str) -> CreateSnapshotRequest {
    CreateSnapshotRequest::new("team", "WS", version_label, "prod", "http://agent")
        .created_by("user-1")
}

#[fixture]
fn harness() -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.add_workspace("WS", "Workspace");
    let agent = Arc::new(ScriptedAgent::new("prod"));
    agent.push_service_list(listing(vec![
        documented("orders"),
        documented("billing"),
        DiscoveredService::new("sidecar", "sidecar"),
    ]));
    agent.add_specification("orders", "orders.json", b"{\"openapi\":\"3.0.0\"}".to_vec());
    agent.add_specification("billing", "billing.json", b"{\"openapi\":\"3.0.1\"}".to_vec());
    let service = SnapshotService::new(
        Arc::clone(&catalog),
        Arc::clone(&agent),
        Arc::from("https://hub"),
        "RUNENV",
    );
    Harness {
        catalog,
        agent,
        service,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn snapshot_publishes_services_then_dashboard(harness: Harness) {
    let outcome = harness
        .service
        .create_snapshot(&request("2024.1"))
        .await
        .expect("snapshot should be accepted");

    let dashboard = outcome.dashboard.clone().expect("dashboard publish");
    assert_eq!(dashboard.package_id, format!("{GROUP}.SNAPSHOT-DASH"));
    let package_ids: Vec<&str> = outcome
        .services
        .iter()
        .map(|config| config.package_id.as_str())
        .collect();
    assert_eq!(
        package_ids,
        vec![format!("{GROUP}.ORDERS"), format!("{GROUP}.BILLING")]
    );

    let orders = outcome.services.first().expect("orders config");
    assert_eq!(orders.service_id, "orders");
    assert_eq!(orders.status, "draft");
    assert_eq!(orders.created_by, "user-1");
    assert_eq!(orders.metadata.version_labels, vec!["team:core".to_owned()]);
    assert_eq!(orders.metadata.cloud_name, "prod");
    assert_eq!(orders.metadata.namespace, "team");
    assert_eq!(
        orders.apihub_package_url,
        format!("https://hub/portal/packages/{GROUP}.ORDERS/2024.1/overview/summary")
    );
    let file = orders.files.first().expect("orders file");
    assert_eq!(file.file_id, "orders.json");
    assert!(file.publish);

    let expected_ids: Vec<String> = outcome
        .services
        .iter()
        .map(|config| config.publish_id.clone())
        .collect();
    let report = outcome.dispatch.wait().await;
    assert!(!report.is_degraded());
    assert_eq!(report.dispatched, expected_ids);

    let publications = harness.catalog.publications();
    assert_eq!(publications.len(), 3);
    let last = publications.last().expect("dashboard publication");
    assert_eq!(last.config.package_id, dashboard.package_id);
    assert_eq!(last.config.publish_id, dashboard.publish_id);
    assert_eq!(last.dependencies, expected_ids);
    assert!(last.sources.is_none());
    assert_eq!(last.config.refs.len(), 2);
    assert!(
        publications
            .iter()
            .filter(|publication| publication.config.package_id != dashboard.package_id)
            .all(|publication| publication.sources.is_some() && !publication.save_sources)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_excludes_the_service(harness: Harness) {
    let agent = ScriptedAgent::new("prod");
    agent.push_service_list(listing(vec![documented("orders"), documented("billing")]));
    agent.add_specification("orders", "orders.json", b"{}".to_vec());
    let service = SnapshotService::new(
        Arc::clone(&harness.catalog),
        Arc::new(agent),
        Arc::from("https://hub"),
        "RUNENV",
    );

    let outcome = service
        .create_snapshot(&request("2024.2"))
        .await
        .expect("snapshot should be accepted");
    let orders_publish = outcome
        .services
        .first()
        .map(|config| config.publish_id.clone())
        .expect("orders config");
    let report = outcome.dispatch.wait().await;

    assert!(report.is_degraded());
    assert_eq!(report.dispatched, vec![orders_publish.clone()]);
    let reason = report
        .excluded_services
        .get("billing")
        .expect("billing should be excluded");
    assert!(
        reason.starts_with("unable to get specification billing"),
        "unexpected reason: {reason}"
    );
    let dashboard = harness
        .catalog
        .publications()
        .into_iter()
        .find(|publication| publication.config.package_id.ends_with("SNAPSHOT-DASH"))
        .expect("dashboard publication");
    assert_eq!(dashboard.dependencies, vec![orders_publish]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_publication_excludes_the_service(harness: Harness) {
    harness.catalog.reject_publication(&format!("{GROUP}.ORDERS"));

    let outcome = harness
        .service
        .create_snapshot(&request("2024.3"))
        .await
        .expect("snapshot should be accepted");
    let report = outcome.dispatch.wait().await;

    let reason = report
        .excluded_services
        .get("orders")
        .expect("orders should be excluded");
    assert!(reason.starts_with("failed to send publish request"));
    assert_eq!(report.dispatched.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn previous_version_kept_only_when_published(harness: Harness) {
    let _base = harness
        .catalog
        .add_package("WS", PackageKind::Group, "BASE", "Base", None);
    let orders_base = harness.catalog.add_package(
        "WS.BASE",
        PackageKind::Package,
        "ORDERS",
        "orders",
        Some("orders"),
    );
    let billing_base = harness.catalog.add_package(
        "WS.BASE",
        PackageKind::Package,
        "BILLING",
        "billing",
        Some("billing"),
    );
    harness.catalog.insert_version(version(&orders_base, "1.0", "release"));
    harness.catalog.insert_version(version(&billing_base, "1.0", "draft"));
    let agent = ScriptedAgent::new("prod");
    agent.push_service_list(listing(vec![
        documented("orders").with_baseline(orders_base.as_str(), vec!["1.0".to_owned()]),
        documented("billing").with_baseline(billing_base.as_str(), vec!["1.0".to_owned()]),
    ]));
    let service = SnapshotService::new(
        Arc::clone(&harness.catalog),
        Arc::new(agent),
        Arc::from("https://hub"),
        "RUNENV",
    );

    let outcome = service
        .create_snapshot(&request("2.0").with_previous_version("1.0"))
        .await
        .expect("snapshot should be accepted");

    let orders = outcome.services.first().expect("orders config");
    assert_eq!(orders.previous_version.as_deref(), Some("1.0"));
    assert_eq!(
        orders.previous_version_package_id.as_deref(),
        Some(orders_base.as_str())
    );
    let billing = outcome.services.get(1).expect("billing config");
    assert_eq!(billing.previous_version, None);
    assert_eq!(billing.previous_version_package_id, None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn promotion_publishes_into_baselines(harness: Harness) {
    let _base = harness
        .catalog
        .add_package("WS", PackageKind::Group, "BASE", "Base", None);
    let orders_base = harness.catalog.add_package(
        "WS.BASE",
        PackageKind::Package,
        "ORDERS",
        "orders",
        Some("orders"),
    );
    let agent = ScriptedAgent::new("prod");
    agent.push_service_list(listing(vec![
        documented("orders").with_baseline(orders_base.as_str(), Vec::new()),
        documented("billing"),
    ]));
    agent.add_specification("orders", "orders.json", b"{}".to_vec());
    let service = SnapshotService::new(
        Arc::clone(&harness.catalog),
        Arc::new(agent),
        Arc::from("https://hub"),
        "RUNENV",
    );

    let outcome = service
        .create_snapshot(&request("3.0").promoting())
        .await
        .expect("promotion should be accepted");

    assert!(outcome.dashboard.is_none());
    assert_eq!(outcome.services.len(), 1);
    let orders = outcome.services.first().expect("orders config");
    assert_eq!(orders.package_id, orders_base);
    assert_eq!(orders.previous_version_package_id, None);
    assert!(harness.catalog.package("WS.RUNENV").is_none());

    let report = outcome.dispatch.wait().await;
    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(harness.catalog.publications().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn incomplete_discovery_is_refused(harness: Harness) {
    let agent = ScriptedAgent::new("prod");
    agent.push_service_list(ServiceList {
        status: DiscoveryStatus::Running,
        ..ServiceList::default()
    });
    let service = SnapshotService::new(
        Arc::clone(&harness.catalog),
        Arc::new(agent),
        Arc::from("https://hub"),
        "RUNENV",
    );

    let err = service
        .create_snapshot(&request("1"))
        .await
        .expect_err("running discovery should be refused");

    assert_eq!(
        err.to_string(),
        "unable to create snapshot since service discovery status is running"
    );
    assert_eq!(err.code(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_workspace_is_refused(harness: Harness) {
    let _group = harness
        .catalog
        .add_package("WS", PackageKind::Group, "GRP", "group", None);
    let missing = CreateSnapshotRequest::new("team", "NOPE", "1", "prod", "http://agent");
    let not_workspace = CreateSnapshotRequest::new("team", "WS.GRP", "1", "prod", "http://agent");

    for candidate in [missing, not_workspace] {
        let err = harness
            .service
            .create_snapshot(&candidate)
            .await
            .expect_err("workspace should be refused");
        assert!(matches!(err, SnapshotError::WorkspaceNotFound(_)));
        assert_eq!(err.code(), Some(ErrorCode::WorkspaceNotFound));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reserved_character_is_refused(harness: Harness) {
    let err = harness
        .service
        .create_snapshot(&request("1.0@2"))
        .await
        .expect_err("label should be refused");

    assert_eq!(err.code(), Some(ErrorCode::VersionNameNotAllowed));
    assert!(harness.agent.discovery_starts().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_selection_is_refused(harness: Harness) {
    let err = harness
        .service
        .create_snapshot(&request("1").with_services(vec!["sidecar".to_owned()]))
        .await
        .expect_err("undocumented selection should be refused");

    assert_eq!(
        err.to_string(),
        "create snapshot failed: no (selected) services in namespace team, try to run discovery"
    );
    assert!(harness.catalog.created_requests().is_empty());
}
