//! Tests for discovery validation, structure mirroring, and listing.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::adapters::memory::InMemoryAgentRegistry;
use crate::agent::domain::{AgentHeartbeat, AgentId, AgentRecord, PersistedAgentData};
use crate::agent::ports::AgentRegistryRepository;
use crate::agent::services::AgentRegistryService;
use crate::discovery::services::{DiscoveryError, DiscoveryService};
use crate::error::ErrorCode;
use crate::gateway::adapters::memory::{InMemoryCatalog, ScriptedAgent};
use crate::gateway::domain::{
    DiscoveredService, DiscoveryStatus, PackageKind, ServiceList, ServiceName,
};
use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

type TestService =
    DiscoveryService<InMemoryAgentRegistry, DefaultClock, InMemoryCatalog, ScriptedAgent>;

struct Harness {
    registry: Arc<InMemoryAgentRegistry>,
    catalog: Arc<InMemoryCatalog>,
    agent: Arc<ScriptedAgent>,
    agent_id: AgentId,
}

impl Harness {
    fn service(&self, default_workspace_id: Option<&str>) -> TestService {
        let agents = AgentRegistryService::new(
            Arc::clone(&self.registry),
            Arc::new(DefaultClock),
            Duration::from_secs(30),
        );
        DiscoveryService::new(
            agents,
            Arc::clone(&self.catalog),
            Arc::clone(&self.agent),
            default_workspace_id.map(ToOwned::to_owned),
        )
    }

    async fn register(&self, heartbeat: AgentHeartbeat) -> AgentId {
        let agents = AgentRegistryService::new(
            Arc::clone(&self.registry),
            Arc::new(DefaultClock),
            Duration::from_secs(30),
        );
        let record = agents
            .heartbeat(heartbeat)
            .await
            .expect("heartbeat should succeed");
        record.id().clone()
    }
}

/// One active agent in `prod` seeing namespace `team`, a target workspace
/// `WS`, and a default workspace `DEF` documenting `orders`.
#[fixture]
async fn harness() -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.add_workspace("WS", "Workspace");
    catalog.add_workspace("DEF", "Default");
    let platform = catalog.add_package("DEF", PackageKind::Group, "PLATFORM", "Platform", None);
    let _orders = catalog.add_package(
        &platform,
        PackageKind::Package,
        "ORDERS",
        "Orders",
        Some("orders"),
    );

    let agent = Arc::new(ScriptedAgent::new("prod"));
    agent.add_namespace("team");
    agent.set_service_names(
        "team",
        vec![ServiceName {
            id: "orders".to_owned(),
            name: "Orders".to_owned(),
        }],
    );

    let mut harness = Harness {
        registry: Arc::new(InMemoryAgentRegistry::new()),
        catalog,
        agent,
        agent_id: AgentId::new(""),
    };
    harness.agent_id = harness
        .register(
            AgentHeartbeat::new("prod", "team", "http://agent", "1.0.0")
                .with_agent_version("2.0.0"),
        )
        .await;
    harness
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_discovery_triggers_the_agent(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(None);

    let target = service
        .start_discovery(&harness.agent_id, "team", "WS", true)
        .await
        .expect("discovery should start");

    assert_eq!(target.cloud_name, "prod");
    assert_eq!(target.agent_url(), "http://agent");
    assert_eq!(target.workspace_id(), "WS");
    assert_eq!(
        harness.agent.discovery_starts(),
        vec![("team".to_owned(), "WS".to_owned())]
    );
    assert!(harness.catalog.created_requests().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn default_workspace_structure_is_mirrored_first(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(Some("DEF"));

    service
        .start_discovery(&harness.agent_id, "team", "WS", false)
        .await
        .expect("discovery should start");

    let mirrored = harness
        .catalog
        .package("WS.DEF.PLATFORM.ORDERS")
        .expect("service package should be mirrored");
    assert_eq!(mirrored.service_name.as_deref(), Some("orders"));
    let product = harness.catalog.package("WS.DEF").expect("product group");
    assert_eq!(product.default_role, "viewer");
    assert_eq!(harness.agent.discovery_starts().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn discovery_into_default_workspace_skips_mirroring(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(Some("DEF"));

    service
        .start_discovery(&harness.agent_id, "team", "DEF", false)
        .await
        .expect("discovery should start");

    assert!(harness.catalog.created_requests().is_empty());
    assert_eq!(
        harness.agent.discovery_starts(),
        vec![("team".to_owned(), "DEF".to_owned())]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_mirroring_prevents_discovery(#[future] harness: Harness) {
    let harness = harness.await;
    harness.catalog.reject_creation("WS.DEF");
    let service = harness.service(Some("DEF"));

    let err = service
        .start_discovery(&harness.agent_id, "team", "WS", false)
        .await
        .expect_err("mirroring should fail");

    assert!(matches!(err, DiscoveryError::Replication { .. }));
    assert!(
        err.to_string()
            .starts_with("failed to copy package services from 'DEF' to 'WS': ")
    );
    assert_eq!(err.code(), None);
    assert!(harness.agent.discovery_starts().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_agent_is_rejected(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(None);

    let err = service
        .start_discovery(&AgentId::new("nowhere_team"), "team", "WS", false)
        .await
        .expect_err("agent is unknown");

    assert_eq!(err.code(), Some(ErrorCode::AgentNotFound));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inactive_agent_is_rejected(#[future] harness: Harness) {
    let harness = harness.await;
    let id = AgentId::from_deployment("old", "team");
    let stale = AgentRecord::from_persisted(PersistedAgentData {
        id: id.clone(),
        cloud: "old".to_owned(),
        namespace: "team".to_owned(),
        url: "http://old".to_owned(),
        backend_version: "1.0.0".to_owned(),
        name: None,
        agent_version: Some("2.0.0".to_owned()),
        last_active: Utc::now() - TimeDelta::minutes(5),
    });
    harness
        .registry
        .upsert(&stale)
        .await
        .expect("seed should succeed");

    let err = harness
        .service(None)
        .start_discovery(&id, "team", "WS", false)
        .await
        .expect_err("agent is inactive");

    assert_eq!(err.code(), Some(ErrorCode::InactiveAgent));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unversioned_agent_is_rejected(#[future] harness: Harness) {
    let harness = harness.await;
    let id = harness
        .register(AgentHeartbeat::new("legacy", "team", "http://legacy", "1.0.0"))
        .await;

    let err = harness
        .service(None)
        .start_discovery(&id, "team", "WS", false)
        .await
        .expect_err("agent is incompatible");

    assert_eq!(err.code(), Some(ErrorCode::IncompatibleAgentVersion));
}

#[rstest]
#[case("MISSING")]
#[case("DEF.PLATFORM")]
#[tokio::test(flavor = "multi_thread")]
async fn non_workspace_targets_are_rejected(#[future] harness: Harness, #[case] workspace_id: &str) {
    let harness = harness.await;

    let err = harness
        .service(None)
        .start_discovery(&harness.agent_id, "team", workspace_id, false)
        .await
        .expect_err("workspace is invalid");

    assert_eq!(err.code(), Some(ErrorCode::WorkspaceNotFound));
    assert_eq!(err.to_string(), format!("Workspace '{workspace_id}' not found"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_namespace_is_rejected(#[future] harness: Harness) {
    let harness = harness.await;

    let err = harness
        .service(None)
        .start_discovery(&harness.agent_id, "elsewhere", "WS", false)
        .await
        .expect_err("namespace is unknown");

    assert_eq!(err.code(), Some(ErrorCode::NamespaceNotFound));
    assert!(harness.agent.discovery_starts().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn namespace_is_checked_before_workspace(#[future] harness: Harness) {
    let harness = harness.await;

    let err = harness
        .service(None)
        .resolve_target(&harness.agent_id, "elsewhere", "MISSING")
        .await
        .expect_err("namespace and workspace are both unknown");

    assert_eq!(err.code(), Some(ErrorCode::NamespaceNotFound));
    assert_eq!(
        err.to_string(),
        "Namespace 'elsewhere' not found for agent 'prod_team'"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agent_is_checked_before_namespace_and_workspace(#[future] harness: Harness) {
    let harness = harness.await;

    let err = harness
        .service(None)
        .resolve_target(&AgentId::new("nowhere_team"), "elsewhere", "MISSING")
        .await
        .expect_err("everything is unknown");

    assert_eq!(err.code(), Some(ErrorCode::AgentNotFound));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_trigger_is_reported(#[future] harness: Harness) {
    let harness = harness.await;
    harness.agent.fail_discovery("discovery is busy");

    let err = harness
        .service(None)
        .start_discovery(&harness.agent_id, "team", "WS", false)
        .await
        .expect_err("trigger should fail");

    assert!(matches!(err, DiscoveryError::Start(_)));
    assert_eq!(
        err.to_string(),
        "failed to start service discovery: discovery is busy: status code 500"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_services_relays_the_agent_listing(#[future] harness: Harness) {
    let harness = harness.await;
    let listing = ServiceList {
        services: vec![DiscoveredService::new("orders", "Orders")],
        status: DiscoveryStatus::Running,
        debug: String::new(),
    };
    harness.agent.push_service_list(listing.clone());

    let relayed = harness
        .service(None)
        .list_services(&harness.agent_id, "team", "WS")
        .await
        .expect("listing should succeed");

    assert_eq!(relayed, listing);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_services_requires_a_registered_agent(#[future] harness: Harness) {
    let harness = harness.await;

    let err = harness
        .service(None)
        .list_services(&AgentId::new("nowhere_team"), "team", "WS")
        .await
        .expect_err("agent is unknown");

    assert_eq!(err.code(), Some(ErrorCode::AgentNotFound));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn target_listing_uses_the_resolved_agent(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(None);
    let target = service
        .resolve_target(&harness.agent_id, "team", "WS")
        .await
        .expect("target should resolve");
    let listing = ServiceList {
        services: vec![DiscoveredService::new("orders", "Orders")],
        status: DiscoveryStatus::Complete,
        debug: String::new(),
    };
    harness.agent.push_service_list(listing.clone());

    let relayed = service
        .list_target_services(&target)
        .await
        .expect("listing should succeed");

    assert_eq!(relayed, listing);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_target_listing_is_reported(#[future] harness: Harness) {
    let harness = harness.await;
    let service = harness.service(None);
    let target = service
        .resolve_target(&harness.agent_id, "team", "WS")
        .await
        .expect("target should resolve");
    harness.agent.fail_listing("listing unavailable");

    let err = service
        .list_target_services(&target)
        .await
        .expect_err("listing should fail");

    assert!(matches!(err, DiscoveryError::ListServices(_)));
    assert_eq!(
        err.to_string(),
        "failed to get service list: listing unavailable: status code 500"
    );
}
