mod events_service;

pub use events_service::*;
