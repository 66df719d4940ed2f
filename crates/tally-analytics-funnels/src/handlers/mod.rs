pub mod handler;
pub mod types;

pub use handler::{configure_routes, FunnelApiDoc};
pub use types::AppState;
