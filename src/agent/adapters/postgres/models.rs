//! Diesel row models for agent registry persistence.

use super::schema::agents;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for agent records.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = agents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AgentRow {
    /// Agent identifier.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub agent_id: String,
    /// Deployment cloud.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub cloud: String,
    /// Deployment namespace.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub namespace: String,
    /// Agent base URL.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub url: String,
    /// Backend component version.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub backend_version: String,
    /// Optional display name.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub name: Option<String>,
    /// Optional agent version.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Varchar>)]
    pub agent_version: Option<String>,
    /// Last heartbeat timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub last_active: DateTime<Utc>,
}

/// Insert and upsert model for agent records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = agents)]
#[diesel(primary_key(agent_id))]
#[diesel(treat_none_as_null = true)]
pub struct NewAgentRow {
    /// Agent identifier.
    pub agent_id: String,
    /// Deployment cloud.
    pub cloud: String,
    /// Deployment namespace.
    pub namespace: String,
    /// Agent base URL.
    pub url: String,
    /// Backend component version.
    pub backend_version: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional agent version.
    pub agent_version: Option<String>,
    /// Last heartbeat timestamp.
    pub last_active: DateTime<Utc>,
}
