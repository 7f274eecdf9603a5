//! `PostgreSQL` repository implementation for security checks.

use super::{
    models::{ProcessRow, ProcessSummaryRow, ResultRow, ServiceRow},
    schema::{security_check_processes, security_check_results, security_check_services},
};
use crate::agent::domain::AgentId;
use crate::security_check::{
    domain::{
        EndpointResult, ProcessId, ProcessScope, ProcessStatus, ProcessSummary, ReportFilter,
        SecurityCheckProcess, ServiceCheck, ServiceStatus,
    },
    ports::{AuditRepository, AuditRepositoryError, AuditRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;

/// `PostgreSQL` connection pool type used by the audit repository.
pub type AuditPgPool = Pool<ConnectionManager<PgConnection>>;

/// Process columns with service row counts. Callers append the `WHERE`
/// clause, and `GROUP BY p.process_id` must follow it. `failed` service rows
/// count as processed alongside `complete` and `error`.
const SUMMARY_SELECT: &str = concat!(
    "SELECT p.process_id, p.agent_id, p.namespace, p.workspace_id, p.cloud_name, ",
    "p.status, p.details, p.started_at, p.started_by, p.finished_at, ",
    "COUNT(s.service_id) FILTER (WHERE s.status IN ('complete', 'failed', 'error')) ",
    "AS services_processed, ",
    "COUNT(s.service_id) AS services_total ",
    "FROM security_check_processes p ",
    "LEFT JOIN security_check_services s ON s.process_id = p.process_id ",
);

/// `PostgreSQL`-backed audit repository.
#[derive(Debug, Clone)]
pub struct PostgresAuditRepository {
    pool: AuditPgPool,
}

impl PostgresAuditRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: AuditPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> AuditRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AuditRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AuditRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(AuditRepositoryError::persistence)?
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn create_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()> {
        let row = to_process_row(process);
        self.run_blocking(move |connection| {
            diesel::insert_into(security_check_processes::table)
                .values(&row)
                .execute(connection)
                .map_err(AuditRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn update_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()> {
        let process_id = process.process_id;
        let status = process.status.as_str();
        let details = process.details.clone();
        let finished_at = process.finished_at;
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                security_check_processes::table.find(process_id.into_inner()),
            )
            .set((
                security_check_processes::status.eq(status),
                security_check_processes::details.eq(&details),
                security_check_processes::finished_at.eq(finished_at),
            ))
            .execute(connection)
            .map_err(AuditRepositoryError::persistence)?;
            if updated == 0 {
                return Err(AuditRepositoryError::ProcessNotFound(process_id));
            }
            Ok(())
        })
        .await
    }

    async fn save_services(&self, services: &[ServiceCheck]) -> AuditRepositoryResult<()> {
        if services.is_empty() {
            return Ok(());
        }
        let rows = services
            .iter()
            .map(to_service_row)
            .collect::<AuditRepositoryResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            use security_check_services::dsl;
            diesel::insert_into(dsl::security_check_services)
                .values(&rows)
                .on_conflict((dsl::process_id, dsl::service_id))
                .do_update()
                .set((
                    dsl::apihub_url.eq(excluded(dsl::apihub_url)),
                    dsl::package_id.eq(excluded(dsl::package_id)),
                    dsl::version.eq(excluded(dsl::version)),
                    dsl::endpoints_total.eq(excluded(dsl::endpoints_total)),
                    dsl::endpoints_failed.eq(excluded(dsl::endpoints_failed)),
                    dsl::status.eq(excluded(dsl::status)),
                    dsl::details.eq(excluded(dsl::details)),
                ))
                .execute(connection)
                .map_err(AuditRepositoryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn update_service(&self, service: &ServiceCheck) -> AuditRepositoryResult<()> {
        let row = to_service_row(service)?;
        let process_id = service.process_id;
        let service_id = service.service_id.clone();
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                security_check_services::table.find((row.process_id, row.service_id.clone())),
            )
            .set(&row)
            .execute(connection)
            .map_err(AuditRepositoryError::persistence)?;
            if updated == 0 {
                return Err(AuditRepositoryError::ServiceNotFound {
                    process_id,
                    service_id,
                });
            }
            Ok(())
        })
        .await
    }

    async fn save_results(&self, results: &[EndpointResult]) -> AuditRepositoryResult<()> {
        if results.is_empty() {
            return Ok(());
        }
        let rows: Vec<ResultRow> = results.iter().map(to_result_row).collect();
        self.run_blocking(move |connection| {
            match diesel::insert_into(security_check_results::table)
                .values(&rows)
                .execute(connection)
            {
                Ok(_) => Ok(()),
                Err(err) => {
                    let duplicate = if matches!(
                        err,
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
                    ) {
                        duplicate_result(connection, &rows)?
                    } else {
                        None
                    };
                    Err(duplicate.unwrap_or_else(|| AuditRepositoryError::persistence(err)))
                }
            }
        })
        .await
    }

    async fn list_services(&self, process_id: ProcessId) -> AuditRepositoryResult<Vec<ServiceCheck>> {
        self.run_blocking(move |connection| {
            let rows = security_check_services::table
                .filter(security_check_services::process_id.eq(process_id.into_inner()))
                .order(security_check_services::service_id.asc())
                .select(ServiceRow::as_select())
                .load::<ServiceRow>(connection)
                .map_err(AuditRepositoryError::persistence)?;
            rows.into_iter().map(row_to_service).collect()
        })
        .await
    }

    async fn list_results(
        &self,
        process_id: ProcessId,
    ) -> AuditRepositoryResult<Vec<EndpointResult>> {
        self.run_blocking(move |connection| {
            let rows = security_check_results::table
                .filter(security_check_results::process_id.eq(process_id.into_inner()))
                .order((
                    security_check_results::service_id.asc(),
                    security_check_results::method.asc(),
                    security_check_results::path.asc(),
                ))
                .select(ResultRow::as_select())
                .load::<ResultRow>(connection)
                .map_err(AuditRepositoryError::persistence)?;
            rows.into_iter().map(row_to_result).collect()
        })
        .await
    }

    async fn find_summary(
        &self,
        process_id: ProcessId,
    ) -> AuditRepositoryResult<Option<ProcessSummary>> {
        self.run_blocking(move |connection| {
            let row = diesel::sql_query(format!(
                "{SUMMARY_SELECT}WHERE p.process_id = $1 GROUP BY p.process_id"
            ))
            .bind::<diesel::sql_types::Uuid, _>(process_id.into_inner())
            .get_result::<ProcessSummaryRow>(connection)
            .optional()
            .map_err(AuditRepositoryError::persistence)?;
            row.map(row_to_summary).transpose()
        })
        .await
    }

    async fn list_summaries(
        &self,
        filter: &ReportFilter,
    ) -> AuditRepositoryResult<Vec<ProcessSummary>> {
        let agent_id = filter
            .agent_id
            .as_ref()
            .map(|id| id.as_str().to_owned())
            .unwrap_or_default();
        let namespace = filter.namespace.clone().unwrap_or_default();
        let workspace_id = filter.workspace_id.clone().unwrap_or_default();
        let limit = i64::from(filter.limit);
        let offset = i64::try_from(filter.offset())
            .map_err(|err| AuditRepositoryError::Corrupt(err.to_string()))?;
        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(format!(
                "{SUMMARY_SELECT}{}",
                concat!(
                    "WHERE ($1 = '' OR p.agent_id = $1) ",
                    "AND ($2 = '' OR p.namespace = $2) ",
                    "AND ($3 = '' OR p.workspace_id = $3) ",
                    "GROUP BY p.process_id ",
                    "ORDER BY p.started_at DESC, p.process_id ",
                    "LIMIT $4 OFFSET $5",
                )
            ))
            .bind::<diesel::sql_types::Text, _>(agent_id)
            .bind::<diesel::sql_types::Text, _>(namespace)
            .bind::<diesel::sql_types::Text, _>(workspace_id)
            .bind::<diesel::sql_types::BigInt, _>(limit)
            .bind::<diesel::sql_types::BigInt, _>(offset)
            .load::<ProcessSummaryRow>(connection)
            .map_err(AuditRepositoryError::persistence)?;
            rows.into_iter().map(row_to_summary).collect()
        })
        .await
    }
}

/// Names the first row of a rejected batch that clashes with a stored
/// result or with an earlier row of the same batch.
fn duplicate_result(
    connection: &mut PgConnection,
    rows: &[ResultRow],
) -> AuditRepositoryResult<Option<AuditRepositoryError>> {
    let mut seen = std::collections::BTreeSet::new();
    for row in rows {
        let key = (row.process_id, &row.service_id, &row.method, &row.path);
        let stored = diesel::select(diesel::dsl::exists(security_check_results::table.find((
            row.process_id,
            row.service_id.as_str(),
            row.method.as_str(),
            row.path.as_str(),
        ))))
        .get_result::<bool>(connection)
        .map_err(AuditRepositoryError::persistence)?;
        if stored || !seen.insert(key) {
            return Ok(Some(AuditRepositoryError::DuplicateResult {
                service_id: row.service_id.clone(),
                method: row.method.clone(),
                path: row.path.clone(),
            }));
        }
    }
    Ok(None)
}

fn corrupt(err: impl std::fmt::Display) -> AuditRepositoryError {
    AuditRepositoryError::Corrupt(err.to_string())
}

fn to_process_row(process: &SecurityCheckProcess) -> ProcessRow {
    ProcessRow {
        process_id: process.process_id.into_inner(),
        agent_id: process.scope.agent_id.as_str().to_owned(),
        namespace: process.scope.namespace.clone(),
        workspace_id: process.scope.workspace_id.clone(),
        cloud_name: process.scope.cloud_name.clone(),
        status: process.status.as_str().to_owned(),
        details: process.details.clone(),
        started_at: process.started_at,
        started_by: process.started_by.clone(),
        finished_at: process.finished_at,
    }
}

fn row_to_summary(row: ProcessSummaryRow) -> AuditRepositoryResult<ProcessSummary> {
    let ProcessSummaryRow {
        process_id,
        agent_id,
        namespace,
        workspace_id,
        cloud_name,
        status,
        details,
        started_at,
        started_by,
        finished_at,
        services_processed,
        services_total,
    } = row;

    Ok(ProcessSummary {
        process: SecurityCheckProcess {
            process_id: ProcessId::from_uuid(process_id),
            scope: ProcessScope {
                agent_id: AgentId::new(agent_id),
                namespace,
                workspace_id,
                cloud_name,
            },
            status: ProcessStatus::try_from(status.as_str()).map_err(corrupt)?,
            details,
            started_at,
            started_by,
            finished_at,
        },
        services_processed: u64::try_from(services_processed).map_err(corrupt)?,
        services_total: u64::try_from(services_total).map_err(corrupt)?,
    })
}

fn to_service_row(service: &ServiceCheck) -> AuditRepositoryResult<ServiceRow> {
    Ok(ServiceRow {
        process_id: service.process_id.into_inner(),
        service_id: service.service_id.clone(),
        apihub_url: service.catalog_url.clone(),
        package_id: service.package_id.clone(),
        version: service.version.clone(),
        endpoints_total: i32::try_from(service.endpoints_total).map_err(corrupt)?,
        endpoints_failed: i32::try_from(service.endpoints_failed).map_err(corrupt)?,
        status: service.status.as_str().to_owned(),
        details: service.details.clone(),
    })
}

fn row_to_service(row: ServiceRow) -> AuditRepositoryResult<ServiceCheck> {
    Ok(ServiceCheck {
        process_id: ProcessId::from_uuid(row.process_id),
        service_id: row.service_id,
        catalog_url: row.apihub_url,
        package_id: row.package_id,
        version: row.version,
        endpoints_total: u32::try_from(row.endpoints_total).map_err(corrupt)?,
        endpoints_failed: u32::try_from(row.endpoints_failed).map_err(corrupt)?,
        status: ServiceStatus::try_from(row.status.as_str()).map_err(corrupt)?,
        details: row.details,
    })
}

fn to_result_row(result: &EndpointResult) -> ResultRow {
    ResultRow {
        process_id: result.process_id.into_inner(),
        service_id: result.service_id.clone(),
        method: result.method.clone(),
        path: result.path.clone(),
        security: result.security.iter().cloned().collect(),
        details: result.details.clone(),
        actual_response_code: result.actual_response_code.map(i32::from),
        expected_response_code: result.expected_response_code.map(i32::from),
    }
}

fn row_to_result(row: ResultRow) -> AuditRepositoryResult<EndpointResult> {
    let status_code = |code: Option<i32>| code.map(u16::try_from).transpose().map_err(corrupt);
    Ok(EndpointResult {
        process_id: ProcessId::from_uuid(row.process_id),
        service_id: row.service_id,
        method: row.method,
        path: row.path,
        security: row.security.into_iter().collect(),
        details: row.details,
        actual_response_code: status_code(row.actual_response_code)?,
        expected_response_code: status_code(row.expected_response_code)?,
    })
}
