use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tally_core::{DateWindow, PaginationParams, ServiceError};
use tally_entities::events;
use thiserror::Error;
use tracing::debug;

use crate::types::{EventCounts, EventTypeSummary, NewEvent};

#[derive(Debug, Error)]
pub enum EventsError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for EventsError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation { message } => EventsError::Validation(message),
            ServiceError::Database(message) => {
                EventsError::Database(sea_orm::DbErr::Custom(message))
            }
            other => EventsError::Validation(other.to_string()),
        }
    }
}

/// Optional narrowing applied when listing events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub window: Option<DateWindow>,
}

/// Read and append access to the `events` table
pub struct EventsService {
    db: Arc<DatabaseConnection>,
}

impl EventsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append one event. Events are never updated afterwards.
    pub async fn record_event(&self, event: NewEvent) -> Result<events::Model, EventsError> {
        let session_id = event.session_id.trim();
        if session_id.is_empty() {
            return Err(EventsError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }
        let event_type = event.event_type.trim();
        if event_type.is_empty() {
            return Err(EventsError::Validation(
                "event_type must not be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now();
        let model = events::ActiveModel {
            session_id: Set(session_id.to_string()),
            user_id: Set(event.user_id),
            event_type: Set(event_type.to_string()),
            occurred_at: Set(event.occurred_at.map(|dt| dt.0).unwrap_or(now)),
            utm_source: Set(event.utm_source),
            utm_medium: Set(event.utm_medium),
            utm_campaign: Set(event.utm_campaign),
            utm_term: Set(event.utm_term),
            utm_content: Set(event.utm_content),
            page_url: Set(event.page_url),
            properties: Set(event.properties),
            created_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(self.db.as_ref()).await?;
        debug!(
            "Recorded event {} ({}) for session {}",
            inserted.id, inserted.event_type, inserted.session_id
        );
        Ok(inserted)
    }

    /// Most recent events first. Returns the page and the total match count.
    pub async fn list_events(
        &self,
        filter: &EventFilter,
        pagination: &PaginationParams,
    ) -> Result<(Vec<events::Model>, u64), EventsError> {
        let (page, page_size) = pagination.normalize();

        let mut query = events::Entity::find();
        if let Some(event_type) = &filter.event_type {
            query = query.filter(events::Column::EventType.eq(event_type.as_str()));
        }
        if let Some(window) = &filter.window {
            query = query
                .filter(events::Column::OccurredAt.gte(window.lower_bound()))
                .filter(events::Column::OccurredAt.lt(window.upper_bound_exclusive()));
        }

        let paginator = query
            .order_by_desc(events::Column::OccurredAt)
            .order_by_desc(events::Column::Id)
            .paginate(self.db.as_ref(), page_size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    /// Row count and distinct session count for one event type in a window.
    pub async fn count_events(
        &self,
        event_type: &str,
        window: &DateWindow,
    ) -> Result<EventCounts, EventsError> {
        let counts = events::Entity::find()
            .select_only()
            .column_as(Expr::col(events::Column::Id).count(), "total_events")
            .column_as(
                Expr::col(events::Column::SessionId).count_distinct(),
                "unique_sessions",
            )
            .filter(events::Column::EventType.eq(event_type))
            .filter(events::Column::OccurredAt.gte(window.lower_bound()))
            .filter(events::Column::OccurredAt.lt(window.upper_bound_exclusive()))
            .into_model::<EventCounts>()
            .one(self.db.as_ref())
            .await?
            .unwrap_or_default();

        debug!(
            "Counted {} events / {} sessions for '{}' in {}",
            counts.total_events, counts.unique_sessions, event_type, window
        );
        Ok(counts)
    }

    /// Distinct event types with their total counts, most frequent first.
    pub async fn event_types(&self) -> Result<Vec<EventTypeSummary>, EventsError> {
        let types = events::Entity::find()
            .select_only()
            .column(events::Column::EventType)
            .column_as(Expr::col(events::Column::Id).count(), "total_events")
            .group_by(events::Column::EventType)
            .order_by_desc(Expr::col(events::Column::Id).count())
            .order_by_asc(events::Column::EventType)
            .into_model::<EventTypeSummary>()
            .all(self.db.as_ref())
            .await?;

        Ok(types)
    }
}
