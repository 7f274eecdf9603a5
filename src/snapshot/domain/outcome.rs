//! What a snapshot request returns and what its background dispatch reports.

use crate::gateway::domain::BuildConfig;
use std::collections::BTreeMap;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Reason recorded for every service when the dispatch task died.
const DISPATCH_INTERRUPTED: &str = "snapshot dispatch was interrupted";

/// Dashboard publication of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardPublish {
    /// Dashboard package id.
    pub package_id: String,
    /// Publish id of the dashboard version.
    pub publish_id: String,
}

/// Outcome of the background publication of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Publish ids accepted by the catalog, in service order.
    pub dispatched: Vec<String>,
    /// Services left out of the snapshot, with the reason.
    pub excluded_services: BTreeMap<String, String>,
    /// Why the dashboard publication failed, if it did.
    pub dashboard_failure: Option<String>,
}

impl DispatchReport {
    /// Returns whether any part of the snapshot was not submitted.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.excluded_services.is_empty() || self.dashboard_failure.is_some()
    }

    fn interrupted<'a>(service_ids: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            dispatched: Vec::new(),
            excluded_services: service_ids
                .into_iter()
                .map(|id| (id.clone(), DISPATCH_INTERRUPTED.to_owned()))
                .collect(),
            dashboard_failure: Some(DISPATCH_INTERRUPTED.to_owned()),
        }
    }
}

/// Receiving end of a [`DispatchReport`].
#[derive(Debug)]
pub struct DispatchHandle {
    receiver: oneshot::Receiver<DispatchReport>,
    service_ids: Vec<String>,
    delivered: bool,
}

impl DispatchHandle {
    /// Creates a handle for the dispatch of `service_ids`.
    #[must_use]
    pub const fn new(receiver: oneshot::Receiver<DispatchReport>, service_ids: Vec<String>) -> Self {
        Self {
            receiver,
            service_ids,
            delivered: false,
        }
    }

    /// Returns the report once the dispatch finished, at most once.
    ///
    /// A dispatch task that stopped without reporting yields a report
    /// excluding every service.
    pub fn try_report(&mut self) -> Option<DispatchReport> {
        if self.delivered {
            return None;
        }
        let report = match self.receiver.try_recv() {
            Ok(report) => report,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => DispatchReport::interrupted(&self.service_ids),
        };
        self.delivered = true;
        Some(report)
    }

    /// Waits for the dispatch to finish.
    pub async fn wait(self) -> DispatchReport {
        self.receiver
            .await
            .unwrap_or_else(|_| DispatchReport::interrupted(&self.service_ids))
    }
}

/// Result of accepting a snapshot request.
#[derive(Debug)]
pub struct SnapshotOutcome {
    /// Dashboard publication, absent when promoting.
    pub dashboard: Option<DashboardPublish>,
    /// Build configuration of every selected service.
    pub services: Vec<BuildConfig>,
    /// Report of the background publication.
    pub dispatch: DispatchHandle,
}
