//! Service layer for security checks.

mod error;
mod orchestrator;
mod pipeline;
mod reports;

pub use error::{SecurityCheckError, SecurityCheckResult};
pub use orchestrator::SecurityCheckService;
pub use reports::SecurityReportService;
