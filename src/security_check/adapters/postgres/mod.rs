//! `PostgreSQL` adapter for security check persistence.

mod models;
mod repository;
mod schema;

pub use repository::{AuditPgPool, PostgresAuditRepository};
