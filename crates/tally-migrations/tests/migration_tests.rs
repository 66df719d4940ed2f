use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;

use tally_migrations::Migrator;

async fn sqlite_memory() -> anyhow::Result<DatabaseConnection> {
    // A single connection keeps the in-memory database alive for the whole test
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    Ok(Database::connect(opt).await?)
}

async fn table_names(db: &DatabaseConnection) -> anyhow::Result<Vec<String>> {
    let rows = db
        .query_all(Statement::from_string(
            db.get_database_backend(),
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name".to_owned(),
        ))
        .await?;

    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String>("", "name").ok())
        .collect())
}

#[tokio::test]
async fn test_migration_up_creates_tables() -> anyhow::Result<()> {
    let db = sqlite_memory().await?;
    Migrator::up(&db, None).await?;

    let tables = table_names(&db).await?;
    for expected in ["events", "funnels", "funnel_steps"] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {expected}, got {tables:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_migration_down_drops_tables() -> anyhow::Result<()> {
    let db = sqlite_memory().await?;
    Migrator::up(&db, None).await?;
    Migrator::down(&db, None).await?;

    let tables = table_names(&db).await?;
    assert!(!tables.iter().any(|t| t == "events"));
    assert!(!tables.iter().any(|t| t == "funnel_steps"));
    Ok(())
}

#[tokio::test]
async fn test_migrations_are_idempotent() -> anyhow::Result<()> {
    let db = sqlite_memory().await?;
    Migrator::up(&db, None).await?;
    // Second run is a no-op because every migration is recorded
    Migrator::up(&db, None).await?;

    let status = Migrator::get_pending_migrations(&db).await?;
    assert!(status.is_empty());
    Ok(())
}
