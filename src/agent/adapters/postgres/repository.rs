//! `PostgreSQL` repository implementation for the agent registry.

use super::{
    models::{AgentRow, NewAgentRow},
    schema::agents,
};
use crate::agent::{
    domain::{AgentId, AgentRecord, PersistedAgentData},
    ports::{AgentRegistryError, AgentRegistryRepository, AgentRegistryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by the agent registry.
pub type AgentPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed agent registry.
#[derive(Debug, Clone)]
pub struct PostgresAgentRegistry {
    pool: AgentPgPool,
}

impl PostgresAgentRegistry {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: AgentPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> AgentRegistryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AgentRegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AgentRegistryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(AgentRegistryError::persistence)?
    }
}

#[async_trait]
impl AgentRegistryRepository for PostgresAgentRegistry {
    async fn upsert(&self, record: &AgentRecord) -> AgentRegistryResult<()> {
        let row = to_new_row(record);
        self.run_blocking(move |connection| {
            diesel::insert_into(agents::table)
                .values(&row)
                .on_conflict(agents::agent_id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(AgentRegistryError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: &AgentId) -> AgentRegistryResult<Option<AgentRecord>> {
        let agent_id = id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = agents::table
                .filter(agents::agent_id.eq(&agent_id))
                .select(AgentRow::as_select())
                .first::<AgentRow>(connection)
                .optional()
                .map_err(AgentRegistryError::persistence)?;
            Ok(row.map(row_to_record))
        })
        .await
    }

    async fn list(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> AgentRegistryResult<Vec<AgentRecord>> {
        self.run_blocking(move |connection| {
            let mut query = agents::table
                .select(AgentRow::as_select())
                .order(agents::agent_id.asc())
                .into_boxed();
            if let Some(since) = active_since {
                query = query.filter(agents::last_active.ge(since));
            }
            let rows = query
                .load::<AgentRow>(connection)
                .map_err(AgentRegistryError::persistence)?;
            Ok(rows.into_iter().map(row_to_record).collect())
        })
        .await
    }
}

fn to_new_row(record: &AgentRecord) -> NewAgentRow {
    NewAgentRow {
        agent_id: record.id().as_str().to_owned(),
        cloud: record.cloud().to_owned(),
        namespace: record.namespace().to_owned(),
        url: record.url().to_owned(),
        backend_version: record.backend_version().to_owned(),
        name: record.name().map(str::to_owned),
        agent_version: record.agent_version().map(str::to_owned),
        last_active: record.last_active(),
    }
}

fn row_to_record(row: AgentRow) -> AgentRecord {
    let AgentRow {
        agent_id,
        cloud,
        namespace,
        url,
        backend_version,
        name,
        agent_version,
        last_active,
    } = row;

    AgentRecord::from_persisted(PersistedAgentData {
        id: AgentId::new(agent_id),
        cloud,
        namespace,
        url,
        backend_version,
        name,
        agent_version,
        last_active,
    })
}
