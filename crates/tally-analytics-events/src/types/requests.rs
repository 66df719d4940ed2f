use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tally_core::DateTime;
use utoipa::{IntoParams, ToSchema};

/// A user action to append to the event store
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewEvent {
    pub session_id: String,
    pub user_id: Option<String>,
    /// Name of the action, e.g. `page_view` or `purchase`
    pub event_type: String,
    /// Defaults to the time the event is received
    pub occurred_at: Option<DateTime>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub page_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
}

/// Query parameters for listing events
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEventsQuery {
    pub event_type: Option<String>,
    /// First day of the window (inclusive), `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    /// Last day of the window (inclusive), `YYYY-MM-DD`
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}
