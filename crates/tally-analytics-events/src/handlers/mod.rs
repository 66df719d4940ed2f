mod events_handler;

pub use events_handler::*;
