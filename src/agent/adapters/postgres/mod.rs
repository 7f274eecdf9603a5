//! `PostgreSQL` adapter for the agent registry.

mod models;
mod repository;
mod schema;

pub use repository::{AgentPgPool, PostgresAgentRegistry};
