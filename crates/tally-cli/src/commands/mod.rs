pub mod funnel;
pub mod migrate;
pub mod report;
pub mod serve;

pub use funnel::FunnelCommand;
pub use migrate::MigrateCommand;
pub use report::ReportCommand;
pub use serve::ServeCommand;
