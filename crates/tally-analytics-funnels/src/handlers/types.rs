use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tally_analytics_events::EventsError;
use tally_core::error_builder::{conflict, internal_server_error, not_found, validation_failed};
use tally_core::problemdetails::Problem;
use tracing::error;
use utoipa::IntoParams;

use crate::services::{ConversionService, FunnelError, FunnelService};

pub struct AppState {
    pub funnel_service: Arc<FunnelService>,
    pub conversion_service: Arc<ConversionService>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFunnelsQuery {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Items per page (1..=100, default 20)
    pub page_size: Option<u64>,
    /// Only funnels with this active flag
    pub is_active: Option<bool>,
}

/// Inclusive window of whole UTC days
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConversionQuery {
    #[param(value_type = String, format = Date, example = "2025-01-01")]
    pub start_date: NaiveDate,
    #[param(value_type = String, format = Date, example = "2025-01-31")]
    pub end_date: NaiveDate,
}

impl From<FunnelError> for Problem {
    fn from(error: FunnelError) -> Self {
        match error {
            FunnelError::NotFound(id) => not_found()
                .title("Funnel Not Found")
                .detail(format!("Funnel {} does not exist", id))
                .build(),
            FunnelError::Validation(message) => validation_failed()
                .title("Invalid Funnel")
                .detail(message)
                .build(),
            FunnelError::Events(EventsError::Validation(message)) => validation_failed()
                .title("Invalid Event Query")
                .detail(message)
                .build(),
            FunnelError::InvalidDefinition { funnel_id, reason } => {
                error!("Funnel {} has an invalid stored definition: {}", funnel_id, reason);
                conflict()
                    .title("Invalid Funnel Definition")
                    .detail(format!(
                        "Funnel {} cannot be evaluated: {}",
                        funnel_id, reason
                    ))
                    .value("funnel_id", funnel_id)
                    .build()
            }
            FunnelError::Database(e) => {
                error!("Funnel store failure: {}", e);
                internal_server_error().build()
            }
            FunnelError::Events(EventsError::Database(e)) => {
                error!("Event store failure while computing conversion: {}", e);
                internal_server_error().build()
            }
        }
    }
}
