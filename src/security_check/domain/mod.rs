//! Security check processes, per-service progress, endpoint results and
//! the read models built from them.

mod ids;
mod process;
mod report;
mod result;
mod service;
mod status;

pub use ids::ProcessId;
pub use process::{ProcessProgress, ProcessScope, ProcessSummary, SecurityCheckProcess};
pub use report::{
    API_KEY_PRINCIPAL_PREFIX, DEFAULT_REPORT_LIMIT, EndpointRollup, ExportedReport, ReportFilter,
    ReportPrincipal, SecurityCheckReport, ServiceRollup, audit_version_label,
};
pub use result::{EndpointResult, EndpointVerdict, ServiceVerdict, UNAUTHORIZED};
pub use service::{ServiceCheck, UNSUPPORTED_SERVICE};
pub use status::{ParseCheckStatusError, ProcessStatus, ServiceStatus};
