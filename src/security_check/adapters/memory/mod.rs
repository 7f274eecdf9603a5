//! In-memory audit repository.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::security_check::{
    domain::{
        EndpointResult, ProcessId, ProcessSummary, ReportFilter, SecurityCheckProcess,
        ServiceCheck,
    },
    ports::{AuditRepository, AuditRepositoryError, AuditRepositoryResult},
};

type ResultKey = (ProcessId, String, String, String);

#[derive(Debug, Default)]
struct AuditState {
    processes: BTreeMap<ProcessId, SecurityCheckProcess>,
    services: BTreeMap<(ProcessId, String), ServiceCheck>,
    results: BTreeMap<ResultKey, EndpointResult>,
}

impl AuditState {
    fn summary(&self, process: &SecurityCheckProcess) -> ProcessSummary {
        let (total, processed) = self
            .services
            .range((process.process_id, String::new())..)
            .take_while(|((id, _), _)| *id == process.process_id)
            .fold((0, 0), |(seen, done), (_, service)| {
                (seen + 1, done + u64::from(service.status.is_terminal()))
            });
        ProcessSummary {
            process: process.clone(),
            services_processed: processed,
            services_total: total,
        }
    }
}

/// Thread-safe in-memory audit repository.
///
/// Rows live in ordered maps keyed the way the relational tables are, so
/// listings come out in the same order as from `PostgreSQL`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditRepository {
    state: Arc<RwLock<AuditState>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AuditRepositoryResult<RwLockReadGuard<'_, AuditState>> {
        self.state
            .read()
            .map_err(|err| AuditRepositoryError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> AuditRepositoryResult<RwLockWriteGuard<'_, AuditState>> {
        self.state
            .write()
            .map_err(|err| AuditRepositoryError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn create_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()> {
        let mut state = self.write()?;
        if state.processes.contains_key(&process.process_id) {
            return Err(AuditRepositoryError::persistence(std::io::Error::other(
                format!("duplicate security check process {}", process.process_id),
            )));
        }
        state.processes.insert(process.process_id, process.clone());
        Ok(())
    }

    async fn update_process(&self, process: &SecurityCheckProcess) -> AuditRepositoryResult<()> {
        let mut state = self.write()?;
        let stored = state
            .processes
            .get_mut(&process.process_id)
            .ok_or(AuditRepositoryError::ProcessNotFound(process.process_id))?;
        stored.status = process.status;
        stored.details.clone_from(&process.details);
        stored.finished_at = process.finished_at;
        Ok(())
    }

    async fn save_services(&self, services: &[ServiceCheck]) -> AuditRepositoryResult<()> {
        let mut state = self.write()?;
        for service in services {
            state.services.insert(
                (service.process_id, service.service_id.clone()),
                service.clone(),
            );
        }
        Ok(())
    }

    async fn update_service(&self, service: &ServiceCheck) -> AuditRepositoryResult<()> {
        let mut state = self.write()?;
        let key = (service.process_id, service.service_id.clone());
        let stored = state
            .services
            .get_mut(&key)
            .ok_or_else(|| AuditRepositoryError::ServiceNotFound {
                process_id: service.process_id,
                service_id: service.service_id.clone(),
            })?;
        stored.clone_from(service);
        Ok(())
    }

    async fn save_results(&self, results: &[EndpointResult]) -> AuditRepositoryResult<()> {
        let mut state = self.write()?;
        let keyed: Vec<(ResultKey, &EndpointResult)> = results
            .iter()
            .map(|result| {
                let key = (
                    result.process_id,
                    result.service_id.clone(),
                    result.method.clone(),
                    result.path.clone(),
                );
                (key, result)
            })
            .collect();
        if let Some((_, duplicate)) = keyed.iter().find(|(key, _)| state.results.contains_key(key)) {
            return Err(AuditRepositoryError::DuplicateResult {
                service_id: duplicate.service_id.clone(),
                method: duplicate.method.clone(),
                path: duplicate.path.clone(),
            });
        }
        for (key, result) in keyed {
            state.results.insert(key, result.clone());
        }
        Ok(())
    }

    async fn list_services(&self, process_id: ProcessId) -> AuditRepositoryResult<Vec<ServiceCheck>> {
        let state = self.read()?;
        Ok(state
            .services
            .values()
            .filter(|service| service.process_id == process_id)
            .cloned()
            .collect())
    }

    async fn list_results(
        &self,
        process_id: ProcessId,
    ) -> AuditRepositoryResult<Vec<EndpointResult>> {
        let state = self.read()?;
        Ok(state
            .results
            .values()
            .filter(|result| result.process_id == process_id)
            .cloned()
            .collect())
    }

    async fn find_summary(
        &self,
        process_id: ProcessId,
    ) -> AuditRepositoryResult<Option<ProcessSummary>> {
        let state = self.read()?;
        Ok(state
            .processes
            .get(&process_id)
            .map(|process| state.summary(process)))
    }

    async fn list_summaries(
        &self,
        filter: &ReportFilter,
    ) -> AuditRepositoryResult<Vec<ProcessSummary>> {
        let state = self.read()?;
        let mut summaries: Vec<ProcessSummary> = state
            .processes
            .values()
            .map(|process| state.summary(process))
            .filter(|summary| filter.matches(summary))
            .collect();
        summaries.sort_by_key(|summary| {
            (Reverse(summary.process.started_at), summary.process.process_id)
        });
        let skip = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        Ok(summaries.into_iter().skip(skip).take(take).collect())
    }
}
