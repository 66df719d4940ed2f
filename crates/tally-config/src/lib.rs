//! Server configuration for Tally

mod service;

pub use service::{ConfigError, EditorLimits, ServerConfig};
