//! Database connection and test utilities

pub use sea_orm;
mod connection;

pub use connection::{establish_connection, DbConnection};

// Export test utilities for use by other crates in their tests
pub mod test_utils;

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Statement};
    use tally_core::{DatabaseConfig, ServiceError};

    #[tokio::test]
    async fn test_establish_connection_runs_migrations() -> anyhow::Result<()> {
        let db = establish_connection(&DatabaseConfig::new("sqlite::memory:")).await?;

        let row = db
            .query_one(Statement::from_string(
                db.get_database_backend(),
                "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'funnel_steps'"
                    .to_owned(),
            ))
            .await?
            .expect("count row");
        let n: i64 = row.try_get("", "n")?;
        assert_eq!(n, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_establish_connection_reports_bad_url() {
        let err = establish_connection(&DatabaseConfig::new("nosuchdriver://nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
