//! Funnels analytics module
//!
//! Stores funnel definitions and turns them into step-wise conversion
//! reports over a window of recorded events.

pub mod handlers;
pub mod percentage;
pub mod plugin;
pub mod services;

pub use percentage::Percentage;
pub use plugin::FunnelsPlugin;
pub use services::*;
