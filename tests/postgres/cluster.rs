//! Cluster lifecycle helpers for `PostgreSQL` integration tests.
//!
//! Tests share one server per test binary. `AGENTS_TEST_DATABASE_URL`
//! points the suite at an existing server through a superuser URL; without
//! it an embedded server is downloaded and started. When neither is
//! available (for example when running as root, which `initdb` refuses) the
//! fixture yields `None` and each test returns early.

use diesel::prelude::*;
use postgresql_embedded::{PostgreSQL, Settings};
use reqwest::Url;
use rstest::fixture;
use tokio::sync::OnceCell;
use tracing::warn;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Environment variable naming an external superuser connection URL.
pub const EXTERNAL_URL_VAR: &str = "AGENTS_TEST_DATABASE_URL";

static SHARED_CLUSTER: OnceCell<Option<ManagedCluster>> = OnceCell::const_new();

/// Shared `PostgreSQL` cluster handle for integration tests.
pub type PostgresCluster = &'static ManagedCluster;

/// A running server and the URL of its maintenance database.
pub struct ManagedCluster {
    admin_url: Url,
    _embedded: Option<PostgreSQL>,
}

impl ManagedCluster {
    async fn start() -> Result<Self, BoxError> {
        if let Ok(url) = std::env::var(EXTERNAL_URL_VAR) {
            return Ok(Self {
                admin_url: Url::parse(&url)?,
                _embedded: None,
            });
        }
        let mut postgres = PostgreSQL::new(Settings::default());
        postgres
            .setup()
            .await
            .map_err(|err| Box::new(err) as BoxError)?;
        postgres
            .start()
            .await
            .map_err(|err| Box::new(err) as BoxError)?;
        let admin_url = Url::parse(&postgres.settings().url("postgres"))?;
        Ok(Self {
            admin_url,
            _embedded: Some(postgres),
        })
    }

    /// Returns the connection URL of `database` on this server.
    #[must_use]
    pub fn database_url(&self, database: &str) -> String {
        let mut url = self.admin_url.clone();
        url.set_path(database);
        url.to_string()
    }

    /// Creates an empty database with a unique name derived from `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error when the server refuses the statement.
    pub async fn temporary_database(
        &'static self,
        prefix: &str,
    ) -> Result<TemporaryDatabase, BoxError> {
        let name = format!("{prefix}_{}", Uuid::new_v4().simple());
        let sql = format!("CREATE DATABASE {}", quote_identifier(&name));
        let admin_url = self.database_url(self.admin_database());
        tokio::task::spawn_blocking(move || execute_admin_sql(&admin_url, &sql)).await??;
        Ok(TemporaryDatabase {
            cluster: self,
            name,
        })
    }

    fn admin_database(&self) -> &str {
        self.admin_url.path().trim_start_matches('/')
    }
}

/// A database dropped again when the guard goes out of scope.
pub struct TemporaryDatabase {
    cluster: PostgresCluster,
    name: String,
}

impl TemporaryDatabase {
    /// Returns the connection URL of this database.
    #[must_use]
    pub fn url(&self) -> String {
        self.cluster.database_url(&self.name)
    }
}

impl Drop for TemporaryDatabase {
    fn drop(&mut self) {
        let sql = format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(&self.name)
        );
        let admin_url = self.cluster.database_url(self.cluster.admin_database());
        if let Err(err) = execute_admin_sql(&admin_url, &sql) {
            warn!(database = %self.name, error = %err, "failed to drop test database");
        }
    }
}

/// Provides the shared cluster, or `None` when no server can be reached.
#[fixture]
pub async fn postgres_cluster() -> Option<PostgresCluster> {
    SHARED_CLUSTER
        .get_or_init(|| async {
            match ManagedCluster::start().await {
                Ok(cluster) => Some(cluster),
                Err(err) => {
                    warn!(error = %err, "PostgreSQL unavailable, skipping integration tests");
                    None
                }
            }
        })
        .await
        .as_ref()
}

fn execute_admin_sql(url: &str, sql: &str) -> Result<(), BoxError> {
    let mut connection = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    diesel::sql_query(sql)
        .execute(&mut connection)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
