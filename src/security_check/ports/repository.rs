//! Repository port for security check persistence.

use crate::security_check::domain::{
    EndpointResult, ProcessId, ProcessSummary, ReportFilter, SecurityCheckProcess, ServiceCheck,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for audit repository operations.
pub type AuditRepositoryResult<T> = Result<T, AuditRepositoryError>;

/// Persistence contract of security check processes and their rows.
///
/// Counts in [`ProcessSummary`] are derived from service rows: every row
/// counts towards the total, rows in a terminal status count as processed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Stores a new process.
    async fn create_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()>;

    /// Writes the status, details and finish time of an existing process.
    async fn update_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()>;

    /// Inserts service rows, replacing rows with the same process and
    /// service id.
    async fn save_services(&self, services: &[ServiceCheck]) -> AuditRepositoryResult<()>;

    /// Replaces one existing service row.
    async fn update_service(&self, service: &ServiceCheck) -> AuditRepositoryResult<()>;

    /// Inserts endpoint results. Results are written once.
    async fn save_results(&self, results: &[EndpointResult]) -> AuditRepositoryResult<()>;

    /// Lists the service rows of a process ordered by service id.
    async fn list_services(&self, process_id: ProcessId) -> AuditRepositoryResult<Vec<ServiceCheck>>;

    /// Lists the results of a process ordered by service, method and path.
    async fn list_results(&self, process_id: ProcessId)
    -> AuditRepositoryResult<Vec<EndpointResult>>;

    /// Returns a process with its counts.
    async fn find_summary(&self, process_id: ProcessId)
    -> AuditRepositoryResult<Option<ProcessSummary>>;

    /// Lists process summaries passing `filter`, newest first.
    async fn list_summaries(&self, filter: &ReportFilter) -> AuditRepositoryResult<Vec<ProcessSummary>>;
}

/// Errors returned by audit repository implementations.
#[derive(Debug, Clone, Error)]
pub enum AuditRepositoryError {
    /// The process was never stored.
    #[error("security check process {0} not found")]
    ProcessNotFound(ProcessId),

    /// The service row was never stored.
    #[error("service {service_id} of security check process {process_id} not found")]
    ServiceNotFound {
        /// Owning process.
        process_id: ProcessId,
        /// Missing service.
        service_id: String,
    },

    /// A result for the same endpoint was already stored.
    #[error("duplicate result for {method} {path} of service {service_id}")]
    DuplicateResult {
        /// Service of the endpoint.
        service_id: String,
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
    },

    /// A stored value cannot be mapped back to the domain.
    #[error("corrupt security check row: {0}")]
    Corrupt(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AuditRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
