//! `PostgreSQL` integration tests for the agent registry.

use apihub_agents::agent::adapters::memory::InMemoryAgentRegistry;
use apihub_agents::agent::adapters::postgres::PostgresAgentRegistry;
use apihub_agents::agent::domain::{
    ActivityWindow, AgentHeartbeat, AgentId, AgentRecord, AgentStatus, PersistedAgentData,
};
use apihub_agents::agent::ports::AgentRegistryRepository;
use apihub_agents::agent::services::{AgentRegistryService, AgentRegistryServiceError};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

use crate::postgres::helpers::{
    BoxError, MigratedDatabase, PostgresCluster, migrated_database, postgres_cluster,
};

struct RegistryContext {
    registry: Arc<PostgresAgentRegistry>,
    _database: MigratedDatabase,
}

impl RegistryContext {
    fn service(&self) -> AgentRegistryService<PostgresAgentRegistry, DefaultClock> {
        AgentRegistryService::new(
            Arc::clone(&self.registry),
            Arc::new(DefaultClock),
            Duration::from_secs(30),
        )
    }
}

#[fixture]
async fn context(
    #[future] postgres_cluster: Option<PostgresCluster>,
) -> Result<Option<RegistryContext>, BoxError> {
    let Some(cluster) = postgres_cluster.await else {
        return Ok(None);
    };
    let database = migrated_database(cluster, "agents").await?;
    Ok(Some(RegistryContext {
        registry: Arc::new(PostgresAgentRegistry::new(database.pool.clone())),
        _database: database,
    }))
}

/// A whole-second instant, so it survives the microsecond column intact.
fn instant(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_790_000_000 + seconds, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn persisted(namespace: &str, last_active: DateTime<Utc>, name: Option<&str>) -> AgentRecord {
    AgentRecord::from_persisted(PersistedAgentData {
        id: AgentId::from_deployment("prod", namespace),
        cloud: "prod".to_owned(),
        namespace: namespace.to_owned(),
        url: format!("http://{namespace}.agent"),
        backend_version: "1.0.0".to_owned(),
        name: name.map(str::to_owned),
        agent_version: Some("2.0.0".to_owned()),
        last_active,
    })
}

fn ids(records: &[AgentRecord]) -> Vec<String> {
    records.iter().map(|record| record.id().to_string()).collect()
}

/// Seeds three agents, overwrites one, and reads back every listing shape.
async fn listing_scenario<R: AgentRegistryRepository>(
    registry: &R,
) -> Result<Vec<Vec<AgentRecord>>, BoxError> {
    registry.upsert(&persisted("zeta", instant(0), None)).await?;
    registry
        .upsert(&persisted("alpha", instant(-60), Some("Alpha")))
        .await?;
    registry.upsert(&persisted("middle", instant(-30), None)).await?;
    registry.upsert(&persisted("alpha", instant(-10), None)).await?;

    let mut listings = Vec::new();
    for since in [None, Some(instant(-30)), Some(instant(-29)), Some(instant(1))] {
        listings.push(registry.list(since).await?);
    }
    Ok(listings)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_listing_matches_in_memory_registry(
    #[future] context: Result<Option<RegistryContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };

    let expected = listing_scenario(&InMemoryAgentRegistry::new()).await?;
    let actual = listing_scenario(&*ctx.registry).await?;

    assert_eq!(actual, expected);
    let [all, from_cutoff, after_cutoff, future] = actual.as_slice() else {
        return Err(format!("expected four listings, got {}", actual.len()).into());
    };
    assert_eq!(ids(all), ["prod_alpha", "prod_middle", "prod_zeta"]);
    assert_eq!(
        ids(from_cutoff),
        ["prod_alpha", "prod_middle", "prod_zeta"],
        "a heartbeat exactly at the cutoff is active"
    );
    assert_eq!(ids(after_cutoff), ["prod_alpha", "prod_zeta"]);
    assert!(future.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_upsert_replaces_every_column(
    #[future] context: Result<Option<RegistryContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let first = persisted("orders", instant(-60), Some("Orders"));
    ctx.registry.upsert(&first).await?;
    let replacement = AgentRecord::from_persisted(PersistedAgentData {
        id: first.id().clone(),
        cloud: "prod".to_owned(),
        namespace: "orders".to_owned(),
        url: "http://moved.agent".to_owned(),
        backend_version: "1.1.0".to_owned(),
        name: None,
        agent_version: None,
        last_active: instant(0),
    });
    ctx.registry.upsert(&replacement).await?;

    let stored = ctx
        .registry
        .find_by_id(first.id())
        .await?
        .expect("agent should exist");
    assert_eq!(stored, replacement);
    assert_eq!(ctx.registry.list(None).await?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_heartbeat_round_trips_through_the_service(
    #[future] context: Result<Option<RegistryContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let service = ctx.service();
    let record = service
        .heartbeat(
            AgentHeartbeat::new("Prod", "Orders", "http://agent/", "1.0.0")
                .with_agent_version("2.0.0"),
        )
        .await?;

    let found = service.find(record.id()).await?.expect("agent should exist");
    assert_eq!(found.record.id().as_str(), "prod_orders");
    assert_eq!(found.record.url(), "http://agent");
    assert_eq!(found.record.display_name(), "Orders.Prod");
    assert_eq!(found.status, AgentStatus::Active);
    let drift = (found.record.last_active() - record.last_active()).abs();
    assert!(drift < TimeDelta::milliseconds(1), "timestamp drifted by {drift}");

    let usable = service.resolve_usable(record.id()).await?;
    assert_eq!(usable.id(), record.id());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_stale_agent_is_listed_inactive_and_unusable(
    #[future] context: Result<Option<RegistryContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let stale = persisted("legacy", Utc::now() - TimeDelta::minutes(5), None);
    ctx.registry.upsert(&stale).await?;
    let service = ctx.service();

    let all = service.list(false).await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all.first().map(|agent| agent.status), Some(AgentStatus::Inactive));
    assert!(service.list(true).await?.is_empty());

    let err = service
        .resolve_usable(stale.id())
        .await
        .expect_err("stale agent is unusable");
    assert!(matches!(err, AgentRegistryServiceError::Inactive(_)));
    assert_eq!(
        ActivityWindow::new(Duration::from_secs(30)).status_of(stale.last_active(), Utc::now()),
        AgentStatus::Inactive
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_unknown_agent_is_absent(
    #[future] context: Result<Option<RegistryContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };

    assert!(
        ctx.registry
            .find_by_id(&AgentId::new("nowhere_team"))
            .await?
            .is_none()
    );
    Ok(())
}
