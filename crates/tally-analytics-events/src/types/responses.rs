use sea_orm::FromQueryResult;
use serde::Serialize;
use serde_json::Value;
use tally_core::UtcDateTime;
use tally_entities::events;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: i32,
    pub session_id: String,
    pub user_id: Option<String>,
    pub event_type: String,
    #[schema(value_type = String, format = DateTime)]
    pub occurred_at: UtcDateTime,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub page_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: UtcDateTime,
}

impl From<events::Model> for EventResponse {
    fn from(model: events::Model) -> Self {
        Self {
            id: model.id,
            session_id: model.session_id,
            user_id: model.user_id,
            event_type: model.event_type,
            occurred_at: model.occurred_at,
            utm_source: model.utm_source,
            utm_medium: model.utm_medium,
            utm_campaign: model.utm_campaign,
            utm_term: model.utm_term,
            utm_content: model.utm_content,
            page_url: model.page_url,
            properties: model.properties,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Occurrences of one event type inside a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromQueryResult, ToSchema)]
pub struct EventCounts {
    /// Number of matching rows
    pub total_events: i64,
    /// Number of distinct sessions among the matching rows
    pub unique_sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult, ToSchema)]
pub struct EventTypeSummary {
    pub event_type: String,
    pub total_events: i64,
}
