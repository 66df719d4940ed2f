//! Database connection management

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tally_core::{DatabaseConfig, ServiceError, ServiceResult};
use tally_migrations::{Migrator, MigratorTrait};
use tracing::{debug, info};

pub type DbConnection = DatabaseConnection;

/// Connects to the configured database and brings the schema up to date.
pub async fn establish_connection(config: &DatabaseConfig) -> ServiceResult<Arc<DbConnection>> {
    let mut opt = ConnectOptions::new(config.url.as_str());

    if config.is_sqlite() {
        // Every pooled connection to `sqlite::memory:` would see its own database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections);
    }

    opt.connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .sqlx_logging(false);

    debug!("Connecting to database (sqlite: {})", config.is_sqlite());

    let db = Database::connect(opt)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    Migrator::up(&db, None)
        .await
        .map_err(|e| ServiceError::Database(e.to_string()))?;

    info!("Database connected and migrations applied");

    Ok(Arc::new(db))
}
