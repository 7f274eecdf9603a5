//! Port contracts for security check persistence.

pub mod repository;

#[cfg(test)]
pub use repository::MockAuditRepository;
pub use repository::{AuditRepository, AuditRepositoryError, AuditRepositoryResult};
