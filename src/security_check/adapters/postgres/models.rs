//! Diesel row models for security check persistence.

use super::schema::{security_check_processes, security_check_results, security_check_services};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Insert and query row for processes.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = security_check_processes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProcessRow {
    /// Process identifier.
    pub process_id: Uuid,
    /// Agent serving the namespace.
    pub agent_id: String,
    /// Inspected namespace.
    pub namespace: String,
    /// Workspace receiving the audit snapshot.
    pub workspace_id: String,
    /// Cloud the namespace runs in.
    pub cloud_name: String,
    /// Lifecycle status.
    pub status: String,
    /// Outcome details.
    pub details: String,
    /// Request time.
    pub started_at: DateTime<Utc>,
    /// Requesting principal.
    pub started_by: String,
    /// Time the process reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Process row joined with the counts of its service rows.
#[derive(Debug, Clone, QueryableByName)]
pub struct ProcessSummaryRow {
    /// Process identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub process_id: Uuid,
    /// Agent serving the namespace.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub agent_id: String,
    /// Inspected namespace.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub namespace: String,
    /// Workspace receiving the audit snapshot.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub workspace_id: String,
    /// Cloud the namespace runs in.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub cloud_name: String,
    /// Lifecycle status.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub status: String,
    /// Outcome details.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub details: String,
    /// Request time.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub started_at: DateTime<Utc>,
    /// Requesting principal.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub started_by: String,
    /// Time the process reached a terminal status.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Service rows in a terminal status.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub services_processed: i64,
    /// Every service row.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub services_total: i64,
}

/// Insert, query and update row for services.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = security_check_services)]
#[diesel(primary_key(process_id, service_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceRow {
    /// Owning process.
    pub process_id: Uuid,
    /// Discovered service id.
    pub service_id: String,
    /// Catalog base URL.
    pub apihub_url: String,
    /// Published package.
    pub package_id: String,
    /// Published version.
    pub version: String,
    /// Probed endpoints.
    pub endpoints_total: i32,
    /// Endpoints answering differently than expected.
    pub endpoints_failed: i32,
    /// Lifecycle status.
    pub status: String,
    /// Outcome details.
    pub details: String,
}

/// Insert and query row for endpoint results.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = security_check_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ResultRow {
    /// Owning process.
    pub process_id: Uuid,
    /// Probed service.
    pub service_id: String,
    /// HTTP method.
    pub method: String,
    /// Path template.
    pub path: String,
    /// Security schemes guarding the operation.
    pub security: Vec<String>,
    /// Free-text detail.
    pub details: String,
    /// Status the endpoint answered with.
    pub actual_response_code: Option<i32>,
    /// Status expected from the endpoint.
    pub expected_response_code: Option<i32>,
}
