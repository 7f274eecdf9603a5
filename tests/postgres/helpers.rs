//! Shared test helpers for `PostgreSQL` integration tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::TemporaryDatabase;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// SQL creating the agent registry table.
pub const CREATE_AGENTS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_agents/up.sql");

/// SQL creating the security check tables.
pub const CREATE_SECURITY_CHECK_SQL: &str =
    include_str!("../../migrations/2026-10-01-000001_create_security_check_tables/up.sql");

/// A migrated database and a pool connected to it.
///
/// Field order matters: the pool must close before the database is dropped.
pub struct MigratedDatabase {
    /// Connections to the database.
    pub pool: Pool<ConnectionManager<PgConnection>>,
    /// Guard dropping the database.
    pub database: TemporaryDatabase,
}

/// Creates a fresh database with every migration applied.
///
/// # Errors
///
/// Returns an error when the database cannot be created, migrated or
/// connected to.
pub async fn migrated_database(
    cluster: PostgresCluster,
    prefix: &str,
) -> Result<MigratedDatabase, BoxError> {
    let database = cluster.temporary_database(prefix).await?;
    let url = database.url();
    let pool = tokio::task::spawn_blocking(move || {
        let mut connection =
            PgConnection::establish(&url).map_err(|err| Box::new(err) as BoxError)?;
        connection
            .batch_execute(CREATE_AGENTS_SQL)
            .map_err(|err| Box::new(err) as BoxError)?;
        connection
            .batch_execute(CREATE_SECURITY_CHECK_SQL)
            .map_err(|err| Box::new(err) as BoxError)?;
        Pool::builder()
            .max_size(2)
            .build(ConnectionManager::<PgConnection>::new(url))
            .map_err(|err| Box::new(err) as BoxError)
    })
    .await??;
    Ok(MigratedDatabase { pool, database })
}
