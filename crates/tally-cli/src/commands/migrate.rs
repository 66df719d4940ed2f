use clap::Args;
use colored::Colorize;
use tally_core::DatabaseConfig;
use tally_migrations::{Migrator, MigratorTrait};
use tracing::{debug, info};

#[derive(Args)]
pub struct MigrateCommand {
    /// Database connection URL
    #[arg(long, env = "TALLY_DATABASE_URL")]
    pub database_url: String,
}

impl MigrateCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        info!("Running database migrations");

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            // Connecting applies pending migrations
            let db =
                tally_database::establish_connection(&DatabaseConfig::new(self.database_url))
                    .await?;

            let applied = Migrator::get_applied_migrations(db.as_ref()).await?;
            debug!("{} migrations applied", applied.len());

            println!("{}", "Database schema is up to date".bright_green().bold());
            for migration in &applied {
                println!("  {} {}", "✓".bright_green(), migration.name());
            }
            Ok(())
        })
    }
}
