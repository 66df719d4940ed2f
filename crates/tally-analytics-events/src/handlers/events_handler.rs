use crate::services::{EventFilter, EventsError, EventsService};
use crate::types::{EventListResponse, EventResponse, EventTypeSummary, ListEventsQuery, NewEvent};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use tally_core::error_builder::{internal_server_error, validation_failed};
use tally_core::problemdetails::Problem;
use tally_core::{DateWindow, PaginationParams, ProblemDetails};
use tracing::error;

pub struct AppState {
    pub events_service: Arc<EventsService>,
}

impl From<EventsError> for Problem {
    fn from(error: EventsError) -> Self {
        match error {
            EventsError::Validation(message) => validation_failed()
                .title("Invalid Event")
                .detail(message)
                .build(),
            EventsError::Database(e) => {
                error!("Event store failure: {}", e);
                internal_server_error().build()
            }
        }
    }
}

fn window_from_query(query: &ListEventsQuery) -> Result<Option<DateWindow>, EventsError> {
    match (query.start_date, query.end_date) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(DateWindow::new(start, end)?)),
        _ => Err(EventsError::Validation(
            "start_date and end_date must be given together".to_string(),
        )),
    }
}

/// Record a single event
#[utoipa::path(
    post,
    path = "/events",
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event recorded", body = EventResponse),
        (status = 400, description = "Invalid event", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Events"
)]
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewEvent>,
) -> Result<impl IntoResponse, Problem> {
    let stored = state.events_service.record_event(request).await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(stored))))
}

/// List recorded events, newest first
#[utoipa::path(
    get,
    path = "/events",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Page of events", body = EventListResponse),
        (status = 400, description = "Invalid filter", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<EventListResponse>, Problem> {
    let filter = EventFilter {
        event_type: query.event_type.clone(),
        window: window_from_query(&query)?,
    };
    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };
    let (page, page_size) = pagination.normalize();

    let (events, total) = state
        .events_service
        .list_events(&filter, &pagination)
        .await?;

    Ok(Json(EventListResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

/// Distinct event types seen so far
#[utoipa::path(
    get,
    path = "/events/types",
    responses(
        (status = 200, description = "Event types with counts", body = Vec<EventTypeSummary>),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Events"
)]
pub async fn list_event_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventTypeSummary>>, Problem> {
    Ok(Json(state.events_service.event_types().await?))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(record_event))
        .route("/events/types", get(list_event_types))
}

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(record_event, list_events, list_event_types),
    components(schemas(NewEvent, EventResponse, EventListResponse, EventTypeSummary, ProblemDetails)),
    tags(
        (name = "Events", description = "Event store access")
    )
)]
pub struct EventsApiDoc;
