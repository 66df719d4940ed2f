mod conversion_service;
mod funnel_service;

pub use conversion_service::*;
pub use funnel_service::*;
