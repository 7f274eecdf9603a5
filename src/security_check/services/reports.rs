//! Status, listing and export of security checks.

use super::error::{SecurityCheckError, SecurityCheckResult};
use crate::gateway::ports::CatalogGateway;
use crate::security_check::domain::{
    API_KEY_PRINCIPAL_PREFIX, ExportedReport, ProcessId, ProcessProgress, ProcessSummary,
    ReportFilter, ReportPrincipal, SecurityCheckReport,
};
use crate::security_check::ports::AuditRepository;
use futures::future::join_all;
use std::sync::Arc;
use tracing::error;

/// Read side of security checks.
pub struct SecurityReportService<S, C>
where
    S: AuditRepository,
    C: CatalogGateway,
{
    repository: Arc<S>,
    catalog: Arc<C>,
}

impl<S, C> SecurityReportService<S, C>
where
    S: AuditRepository,
    C: CatalogGateway,
{
    /// Creates the service. `catalog` resolves who started each check.
    #[must_use]
    pub const fn new(repository: Arc<S>, catalog: Arc<C>) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    async fn summary(&self, process_id: ProcessId) -> SecurityCheckResult<ProcessSummary> {
        self.repository
            .find_summary(process_id)
            .await?
            .ok_or(SecurityCheckError::NotFound(process_id))
    }

    /// Returns the status of a process with its service counts.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityCheckError::NotFound`] for unknown processes.
    pub async fn get_status(&self, process_id: ProcessId) -> SecurityCheckResult<ProcessProgress> {
        Ok(self.summary(process_id).await?.progress())
    }

    /// Lists processes passing `filter`, newest first, with the principal
    /// that started each one.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityCheckError::Repository`] when the listing fails.
    /// Principal lookup failures only degrade the principal.
    pub async fn list_reports(
        &self,
        filter: &ReportFilter,
    ) -> SecurityCheckResult<Vec<SecurityCheckReport>> {
        let summaries = self.repository.list_summaries(filter).await?;
        let principals = join_all(
            summaries
                .iter()
                .map(|summary| self.principal(&summary.process.started_by)),
        )
        .await;
        Ok(summaries
            .into_iter()
            .zip(principals)
            .map(|(summary, created_by)| SecurityCheckReport {
                process_id: summary.process.process_id,
                created_at: summary.process.started_at,
                created_by,
                status: summary.process.status,
                details: summary.process.details,
                services_processed: summary.services_processed,
                services_total: summary.services_total,
            })
            .collect())
    }

    /// Returns every row of a process with their classifications.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityCheckError::NotFound`] for unknown processes and
    /// [`SecurityCheckError::Repository`] when rows cannot be read.
    pub async fn export_report(&self, process_id: ProcessId) -> SecurityCheckResult<ExportedReport> {
        let summary = self.summary(process_id).await?;
        let services = self.repository.list_services(process_id).await?;
        let results = self.repository.list_results(process_id).await?;
        Ok(ExportedReport::assemble(summary, services, results))
    }

    async fn principal(&self, started_by: &str) -> ReportPrincipal {
        if started_by.starts_with(API_KEY_PRINCIPAL_PREFIX) {
            match self.catalog.get_api_key(started_by).await {
                Ok(Some(api_key)) => {
                    return ReportPrincipal::ApiKey {
                        id: api_key.id,
                        name: api_key.name,
                    };
                }
                Ok(None) => error!(api_key_id = started_by, "api key not found in catalog"),
                Err(err) => error!(
                    api_key_id = started_by,
                    error = %err,
                    "failed to load api key info from catalog"
                ),
            }
        } else {
            match self.catalog.get_user(started_by).await {
                Ok(Some(user)) => {
                    return ReportPrincipal::User {
                        id: user.id,
                        name: Some(user.name),
                        email: Some(user.email),
                        avatar_url: Some(user.avatar_url),
                    };
                }
                Ok(None) => error!(user_id = started_by, "user not found in catalog"),
                Err(err) => error!(
                    user_id = started_by,
                    error = %err,
                    "failed to load user info from catalog"
                ),
            }
        }
        ReportPrincipal::unresolved(started_by)
    }
}
