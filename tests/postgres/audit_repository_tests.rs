//! `PostgreSQL` integration tests for the audit repository.

use apihub_agents::agent::domain::AgentId;
use apihub_agents::security_check::adapters::memory::InMemoryAuditRepository;
use apihub_agents::security_check::adapters::postgres::PostgresAuditRepository;
use apihub_agents::security_check::domain::{
    EndpointResult, ProcessId, ProcessScope, ProcessStatus, ProcessSummary, ReportFilter,
    SecurityCheckProcess, ServiceCheck, ServiceStatus,
};
use apihub_agents::security_check::ports::{AuditRepository, AuditRepositoryError};
use chrono::{DateTime, Utc};
use rstest::{fixture, rstest};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::postgres::helpers::{
    BoxError, MigratedDatabase, PostgresCluster, migrated_database, postgres_cluster,
};

struct AuditContext {
    repository: PostgresAuditRepository,
    _database: MigratedDatabase,
}

#[fixture]
async fn context(
    #[future] postgres_cluster: Option<PostgresCluster>,
) -> Result<Option<AuditContext>, BoxError> {
    let Some(cluster) = postgres_cluster.await else {
        return Ok(None);
    };
    let database = migrated_database(cluster, "audit").await?;
    Ok(Some(AuditContext {
        repository: PostgresAuditRepository::new(database.pool.clone()),
        _database: database,
    }))
}

/// A whole-second instant, so it survives the microsecond column intact.
fn instant(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_790_000_000 + seconds, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn process_id(n: u128) -> ProcessId {
    ProcessId::from_uuid(Uuid::from_u128(n))
}

fn process(n: u128, namespace: &str, workspace_id: &str, started: i64) -> SecurityCheckProcess {
    SecurityCheckProcess {
        process_id: process_id(n),
        scope: ProcessScope {
            agent_id: AgentId::from_deployment("prod", namespace),
            namespace: namespace.to_owned(),
            workspace_id: workspace_id.to_owned(),
            cloud_name: "prod".to_owned(),
        },
        status: ProcessStatus::Running,
        details: String::new(),
        started_at: instant(started),
        started_by: "user-1".to_owned(),
        finished_at: None,
    }
}

fn service(id: ProcessId, service_id: &str, status: ServiceStatus) -> ServiceCheck {
    let mut row = ServiceCheck::probing(id, service_id, "http://catalog", "pkg", "2026.4");
    row.finish(status, format!("{service_id} is {status}"));
    row
}

fn endpoint(id: ProcessId, service_id: &str, method: &str, path: &str) -> EndpointResult {
    EndpointResult::new(id, service_id, method, path, BTreeSet::new())
}

fn summary_ids(summaries: &[ProcessSummary]) -> Vec<ProcessId> {
    summaries
        .iter()
        .map(|summary| summary.process.process_id)
        .collect()
}

/// Seeds four processes: the newest inspects `orders` with one service in
/// each of four statuses, the next inspects `orders` in another workspace
/// with no services at all, and the last two inspect `billing` and start at
/// the same instant.
async fn seed<R: AuditRepository>(repository: &R) -> Result<(), BoxError> {
    let first = process(1, "orders", "ws1", 0);
    repository.create_process(&first).await?;
    repository
        .save_services(&[
            service(first.process_id, "audit", ServiceStatus::Running),
            service(first.process_id, "billing", ServiceStatus::Failed),
            service(first.process_id, "legacy", ServiceStatus::Error),
            service(first.process_id, "orders", ServiceStatus::Complete),
        ])
        .await?;
    repository.create_process(&process(2, "orders", "ws2", -60)).await?;
    for n in [4, 3] {
        let tied = process(n, "billing", "ws1", -120);
        repository.create_process(&tied).await?;
        repository
            .save_services(&[service(tied.process_id, "ledger", ServiceStatus::None)])
            .await?;
    }
    Ok(())
}

async fn summary_listings<R: AuditRepository>(
    repository: &R,
) -> Result<Vec<Vec<ProcessSummary>>, BoxError> {
    seed(repository).await?;
    let filters = [
        ReportFilter::default(),
        ReportFilter {
            agent_id: Some(AgentId::new("prod_orders")),
            ..ReportFilter::default()
        },
        ReportFilter {
            namespace: Some("billing".to_owned()),
            ..ReportFilter::default()
        },
        ReportFilter {
            workspace_id: Some("ws1".to_owned()),
            ..ReportFilter::default()
        },
        ReportFilter {
            limit: 2,
            page: 1,
            ..ReportFilter::default()
        },
        ReportFilter {
            limit: 2,
            page: 2,
            ..ReportFilter::default()
        },
    ];
    let mut listings = Vec::new();
    for filter in &filters {
        listings.push(repository.list_summaries(filter).await?);
    }
    Ok(listings)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_summaries_match_in_memory_repository(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };

    let expected = summary_listings(&InMemoryAuditRepository::new()).await?;
    let actual = summary_listings(&ctx.repository).await?;

    assert_eq!(actual, expected);
    let [all, by_agent, by_namespace, by_workspace, second_page, past_end] = actual.as_slice()
    else {
        return Err(format!("expected six listings, got {}", actual.len()).into());
    };
    let ordered = [process_id(1), process_id(2), process_id(3), process_id(4)];
    assert_eq!(summary_ids(all), ordered, "newest first, ties by process id");
    assert_eq!(summary_ids(by_agent), [process_id(1), process_id(2)]);
    assert_eq!(summary_ids(by_namespace), [process_id(3), process_id(4)]);
    assert_eq!(
        summary_ids(by_workspace),
        [process_id(1), process_id(3), process_id(4)]
    );
    assert_eq!(summary_ids(second_page), [process_id(3), process_id(4)]);
    assert!(past_end.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_summary_counts_failed_services_as_processed(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    seed(&ctx.repository).await?;

    let busy = ctx
        .repository
        .find_summary(process_id(1))
        .await?
        .expect("process 1 should exist");
    assert_eq!((busy.services_processed, busy.services_total), (3, 4));
    assert_eq!(busy.process, process(1, "orders", "ws1", 0));

    let empty = ctx
        .repository
        .find_summary(process_id(2))
        .await?
        .expect("a process without services is still summarised");
    assert_eq!((empty.services_processed, empty.services_total), (0, 0));

    assert!(ctx.repository.find_summary(process_id(9)).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_process_update_writes_outcome(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let mut stored = process(1, "orders", "ws1", 0);
    ctx.repository.create_process(&stored).await?;
    stored.transition(ProcessStatus::Error, "agent went away", instant(90));
    ctx.repository.update_process(&stored).await?;

    let summary = ctx
        .repository
        .find_summary(stored.process_id)
        .await?
        .expect("process should exist");
    assert_eq!(summary.process, stored);
    assert_eq!(summary.process.finished_at, Some(instant(90)));

    let err = ctx
        .repository
        .update_process(&process(7, "orders", "ws1", 0))
        .await
        .expect_err("unknown process");
    assert!(matches!(err, AuditRepositoryError::ProcessNotFound(id) if id == process_id(7)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_service_rows_are_upserted_by_process_and_service(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let stored = process(1, "orders", "ws1", 0);
    ctx.repository.create_process(&stored).await?;
    ctx.repository
        .save_services(&[ServiceCheck::pending(stored.process_id, "orders")])
        .await?;

    let mut checked = service(stored.process_id, "orders", ServiceStatus::Complete);
    checked.endpoints_total = 5;
    checked.endpoints_failed = 2;
    ctx.repository.save_services(&[checked.clone()]).await?;

    assert_eq!(
        ctx.repository.list_services(stored.process_id).await?,
        [checked.clone()]
    );

    checked.finish(ServiceStatus::Error, "catalog refused the upload");
    ctx.repository.update_service(&checked).await?;
    assert_eq!(
        ctx.repository.list_services(stored.process_id).await?,
        [checked]
    );

    let err = ctx
        .repository
        .update_service(&ServiceCheck::pending(stored.process_id, "missing"))
        .await
        .expect_err("unknown service");
    assert!(matches!(
        err,
        AuditRepositoryError::ServiceNotFound { ref service_id, .. } if service_id == "missing"
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_results_round_trip_in_endpoint_order(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let stored = process(1, "orders", "ws1", 0);
    ctx.repository.create_process(&stored).await?;
    ctx.repository
        .save_services(&[
            service(stored.process_id, "billing", ServiceStatus::Running),
            service(stored.process_id, "orders", ServiceStatus::Running),
        ])
        .await?;

    let mut guarded = EndpointResult::new(
        stored.process_id,
        "orders",
        "GET",
        "/orders",
        BTreeSet::from(["apiKey".to_owned(), "oauth".to_owned()]),
    );
    guarded.actual_response_code = Some(200);
    guarded.details = "answered without credentials".to_owned();
    let mut unreachable = endpoint(stored.process_id, "orders", "DELETE", "/orders");
    unreachable.details = "connection reset".to_owned();
    let open = endpoint(stored.process_id, "billing", "POST", "/invoices");
    ctx.repository
        .save_results(&[guarded.clone(), unreachable.clone(), open.clone()])
        .await?;

    let listed = ctx.repository.list_results(stored.process_id).await?;
    assert_eq!(listed, [open, unreachable.clone(), guarded.clone()]);
    assert_eq!(unreachable.actual_response_code, None);
    assert_eq!(unreachable.expected_response_code, None);
    assert!(guarded.is_failed());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn postgres_repeated_result_is_reported_as_duplicate(
    #[future] context: Result<Option<AuditContext>, BoxError>,
) -> Result<(), BoxError> {
    let Some(ctx) = context.await? else {
        return Ok(());
    };
    let stored = process(1, "orders", "ws1", 0);
    ctx.repository.create_process(&stored).await?;
    ctx.repository
        .save_services(&[service(stored.process_id, "orders", ServiceStatus::Running)])
        .await?;
    let first = endpoint(stored.process_id, "orders", "GET", "/orders");
    ctx.repository.save_results(&[first.clone()]).await?;

    let fresh = endpoint(stored.process_id, "orders", "GET", "/status");
    let err = ctx
        .repository
        .save_results(&[fresh, first.clone()])
        .await
        .expect_err("duplicate endpoint");
    assert!(matches!(
        err,
        AuditRepositoryError::DuplicateResult { ref method, ref path, .. }
            if method == "GET" && path == "/orders"
    ));
    assert_eq!(
        ctx.repository.list_results(stored.process_id).await?,
        [first],
        "a rejected batch writes nothing"
    );

    let memory = InMemoryAuditRepository::new();
    memory.create_process(&stored).await?;
    let repeat = endpoint(stored.process_id, "orders", "GET", "/orders");
    memory.save_results(&[repeat.clone()]).await?;
    let memory_err = memory
        .save_results(&[repeat])
        .await
        .expect_err("duplicate endpoint");
    assert_eq!(memory_err.to_string(), err.to_string());
    Ok(())
}
