//! Test utilities for database integration tests
//!
//! `TestDatabase::new()` gives every test its own migrated in-memory SQLite
//! database, so service tests need no external processes. Tests that must
//! run against PostgreSQL use `TestDatabase::new_postgres()`, which starts a
//! shared container once per test binary.

use crate::DbConnection;
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tally_migrations::Migrator;
use testcontainers::{runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt};
use tokio::sync::{Mutex, OnceCell};

/// Shared PostgreSQL container that lives for the duration of the test run
static TEST_CONTAINER: OnceCell<Arc<Mutex<SharedContainer>>> = OnceCell::const_new();

/// Serializes migrations against the shared container
static MIGRATION_LOCK: OnceCell<Arc<Mutex<()>>> = OnceCell::const_new();

/// Tables in dependency order, children first
const TABLES: [&str; 3] = ["funnel_steps", "funnels", "events"];

struct SharedContainer {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    database_url: String,
}

impl SharedContainer {
    async fn new() -> anyhow::Result<Self> {
        let db_name = "test_db";
        let username = "test_user";
        let password = "test_password";

        let postgres_container = GenericImage::new("postgres", "17-alpine")
            .with_env_var("POSTGRES_DB", db_name)
            .with_env_var("POSTGRES_USER", username)
            .with_env_var("POSTGRES_PASSWORD", password)
            .with_env_var("POSTGRES_HOST_AUTH_METHOD", "trust")
            .start()
            .await?;

        let port = postgres_container.get_host_port_ipv4(5432).await?;
        let database_url = format!(
            "postgresql://{}:{}@localhost:{}/{}",
            username, password, port, db_name
        );

        // Wait for the database to be ready
        tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;

        Ok(Self {
            container: postgres_container,
            database_url,
        })
    }
}

/// Migrated database handle for tests
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
    pub database_url: String,
}

impl TestDatabase {
    /// Fresh in-memory SQLite database with all migrations applied.
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = "sqlite::memory:".to_string();

        let mut opt = ConnectOptions::new(database_url.as_str());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await?;

        Migrator::up(&db, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

        Ok(TestDatabase {
            db: Arc::new(db),
            database_url,
        })
    }

    /// PostgreSQL database in a shared container, migrated and emptied.
    pub async fn new_postgres() -> anyhow::Result<Self> {
        let container = TEST_CONTAINER
            .get_or_try_init(|| async {
                let container = SharedContainer::new().await?;
                Ok::<_, anyhow::Error>(Arc::new(Mutex::new(container)))
            })
            .await?
            .clone();
        let database_url = container.lock().await.database_url.clone();

        let db = Self::connect_with_retry(&database_url, 10).await?;

        {
            let lock = MIGRATION_LOCK
                .get_or_init(|| async { Arc::new(Mutex::new(())) })
                .await
                .clone();
            let _guard = lock.lock().await;
            Migrator::up(&db, None)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        }

        let test_db = TestDatabase {
            db: Arc::new(db),
            database_url,
        };
        test_db.cleanup_all_tables().await?;

        Ok(test_db)
    }

    async fn connect_with_retry(
        database_url: &str,
        max_retries: u32,
    ) -> anyhow::Result<DatabaseConnection> {
        let mut attempt = 0;
        loop {
            match Database::connect(database_url).await {
                Ok(db) => return Ok(db),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tokio::time::sleep(tokio::time::Duration::from_millis(500 * attempt as u64))
                        .await;
                    if attempt == max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect after {} retries: {}",
                            max_retries,
                            e
                        ));
                    }
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to connect: {}", e)),
            }
        }
    }

    /// Get a reference to the database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn connection_arc(&self) -> Arc<DbConnection> {
        self.db.clone()
    }

    /// Execute raw SQL for test fixtures
    pub async fn execute_sql(&self, sql: &str) -> anyhow::Result<ExecResult> {
        let stmt = Statement::from_string(self.db.get_database_backend(), sql.to_owned());
        Ok(self.db.execute(stmt).await?)
    }

    /// Query raw SQL for assertions
    pub async fn query_sql(&self, sql: &str) -> anyhow::Result<Vec<QueryResult>> {
        let stmt = Statement::from_string(self.db.get_database_backend(), sql.to_owned());
        Ok(self.db.query_all(stmt).await?)
    }

    /// Removes every row, keeping the schema.
    pub async fn cleanup_all_tables(&self) -> anyhow::Result<()> {
        for table in TABLES {
            self.execute_sql(&format!("DELETE FROM {}", table)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_database_is_migrated() -> anyhow::Result<()> {
        let test_db = TestDatabase::new().await?;
        test_db
            .execute_sql(
                "INSERT INTO funnels (name, is_active, created_at, updated_at) \
                 VALUES ('f', 1, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
            )
            .await?;

        let rows = test_db.query_sql("SELECT id FROM funnels").await?;
        assert_eq!(rows.len(), 1);

        test_db.cleanup_all_tables().await?;
        assert!(test_db.query_sql("SELECT id FROM funnels").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_databases_are_isolated() -> anyhow::Result<()> {
        let a = TestDatabase::new().await?;
        let b = TestDatabase::new().await?;
        a.execute_sql(
            "INSERT INTO events (session_id, event_type, occurred_at, created_at) \
             VALUES ('s', 'page_view', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .await?;

        assert_eq!(a.query_sql("SELECT id FROM events").await?.len(), 1);
        assert!(b.query_sql("SELECT id FROM events").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_postgres_database_is_migrated() -> anyhow::Result<()> {
        let test_db = TestDatabase::new_postgres().await?;
        let rows = test_db
            .query_sql("SELECT table_name FROM information_schema.tables WHERE table_name = 'funnel_steps'")
            .await?;
        assert_eq!(rows.len(), 1);
        Ok(())
    }
}
