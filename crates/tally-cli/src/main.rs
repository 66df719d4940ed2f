//! Tally CLI
//!
//! Runs the HTTP API and offers maintenance commands against the same
//! database: migrations, conversion reports and funnel creation from
//! templates.

mod commands;

use clap::{Parser, Subcommand};
use commands::{FunnelCommand, MigrateCommand, ReportCommand, ServeCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TALLY_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "TALLY_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Apply pending database migrations
    Migrate(MigrateCommand),
    /// Print a conversion report for a stored funnel
    Report(ReportCommand),
    /// Funnel management
    Funnel(FunnelCommand),
}

fn log_filter(level: &str) -> anyhow::Result<tracing_subscriber::EnvFilter> {
    // RUST_LOG takes full control when set
    if std::env::var("RUST_LOG").is_ok() {
        return tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e));
    }

    tracing_subscriber::EnvFilter::try_new(format!(
        "tally_cli={level},\
         tally_core={level},\
         tally_config={level},\
         tally_database={level},\
         tally_migrations={level},\
         tally_analytics_events={level},\
         tally_analytics_funnels={level},\
         tally_funnel_builder={level},\
         tower_http={level},\
         sqlx=warn,\
         sea_orm=warn,\
         sea_orm_migration=warn,\
         h2=warn,\
         tower=warn,\
         hyper=warn",
        level = level
    ))
    .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = log_filter(&cli.log_level)?;

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
        Commands::Migrate(migrate_cmd) => migrate_cmd.execute(),
        Commands::Report(report_cmd) => report_cmd.execute(),
        Commands::Funnel(funnel_cmd) => funnel_cmd.execute(),
    }
}
