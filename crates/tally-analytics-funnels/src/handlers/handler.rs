use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tally_core::problemdetails::Problem;
use tally_core::{PaginationParams, ProblemDetails};

use super::types::{AppState, ConversionQuery, ListFunnelsQuery};
use crate::percentage::Percentage;
use crate::services::{
    ConversionReport, CreateFunnelRequest, FunnelDefinition, FunnelPage, FunnelStepDefinition,
    FunnelStepInput, FunnelSummary, PreviewFunnelRequest, StepReport,
};

/// List funnels
#[utoipa::path(
    get,
    path = "/funnels",
    params(ListFunnelsQuery),
    responses(
        (status = 200, description = "Page of funnels", body = FunnelPage),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn list_funnels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFunnelsQuery>,
) -> Result<Json<FunnelPage>, Problem> {
    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };
    let page = state
        .funnel_service
        .list_funnels(&pagination, query.is_active)
        .await?;
    Ok(Json(page))
}

/// Create a new funnel
#[utoipa::path(
    post,
    path = "/funnels",
    request_body = CreateFunnelRequest,
    responses(
        (status = 201, description = "Funnel created", body = FunnelDefinition),
        (status = 400, description = "Invalid funnel", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn create_funnel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFunnelRequest>,
) -> Result<impl IntoResponse, Problem> {
    let created = state.funnel_service.create_funnel(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a funnel by id
#[utoipa::path(
    get,
    path = "/funnels/{funnel_id}",
    params(
        ("funnel_id" = i32, Path, description = "Funnel ID")
    ),
    responses(
        (status = 200, description = "Funnel definition", body = FunnelDefinition),
        (status = 404, description = "Funnel not found", body = ProblemDetails),
        (status = 409, description = "Stored definition is invalid", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn get_funnel(
    State(state): State<Arc<AppState>>,
    Path(funnel_id): Path<i32>,
) -> Result<Json<FunnelDefinition>, Problem> {
    Ok(Json(state.funnel_service.get_funnel(funnel_id).await?))
}

/// Replace a funnel and all of its steps
#[utoipa::path(
    put,
    path = "/funnels/{funnel_id}",
    params(
        ("funnel_id" = i32, Path, description = "Funnel ID")
    ),
    request_body = CreateFunnelRequest,
    responses(
        (status = 200, description = "Funnel replaced", body = FunnelDefinition),
        (status = 400, description = "Invalid funnel", body = ProblemDetails),
        (status = 404, description = "Funnel not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn replace_funnel(
    State(state): State<Arc<AppState>>,
    Path(funnel_id): Path<i32>,
    Json(request): Json<CreateFunnelRequest>,
) -> Result<Json<FunnelDefinition>, Problem> {
    Ok(Json(
        state
            .funnel_service
            .replace_funnel(funnel_id, request)
            .await?,
    ))
}

/// Delete a funnel and its steps
#[utoipa::path(
    delete,
    path = "/funnels/{funnel_id}",
    params(
        ("funnel_id" = i32, Path, description = "Funnel ID")
    ),
    responses(
        (status = 204, description = "Funnel deleted"),
        (status = 404, description = "Funnel not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn delete_funnel(
    State(state): State<Arc<AppState>>,
    Path(funnel_id): Path<i32>,
) -> Result<StatusCode, Problem> {
    state.funnel_service.delete_funnel(funnel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Conversion report for a stored funnel
#[utoipa::path(
    get,
    path = "/funnels/{funnel_id}/conversion",
    params(
        ("funnel_id" = i32, Path, description = "Funnel ID"),
        ConversionQuery
    ),
    responses(
        (status = 200, description = "Step-wise conversion report", body = ConversionReport),
        (status = 400, description = "Invalid window", body = ProblemDetails),
        (status = 404, description = "Funnel not found", body = ProblemDetails),
        (status = 409, description = "Stored definition is invalid", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn get_funnel_conversion(
    State(state): State<Arc<AppState>>,
    Path(funnel_id): Path<i32>,
    Query(query): Query<ConversionQuery>,
) -> Result<Json<ConversionReport>, Problem> {
    let report = state
        .conversion_service
        .compute_conversion(funnel_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(report))
}

/// Conversion report for an unsaved step list
#[utoipa::path(
    post,
    path = "/funnels/preview",
    params(ConversionQuery),
    request_body = PreviewFunnelRequest,
    responses(
        (status = 200, description = "Step-wise conversion report", body = ConversionReport),
        (status = 400, description = "Invalid steps or window", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnels"
)]
pub async fn preview_funnel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversionQuery>,
    Json(request): Json<PreviewFunnelRequest>,
) -> Result<Json<ConversionReport>, Problem> {
    let report = state
        .conversion_service
        .preview_conversion(request, query.start_date, query.end_date)
        .await?;
    Ok(Json(report))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/funnels", get(list_funnels).post(create_funnel))
        .route("/funnels/preview", post(preview_funnel))
        .route(
            "/funnels/{funnel_id}",
            get(get_funnel).put(replace_funnel).delete(delete_funnel),
        )
        .route("/funnels/{funnel_id}/conversion", get(get_funnel_conversion))
}

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        list_funnels,
        create_funnel,
        get_funnel,
        replace_funnel,
        delete_funnel,
        get_funnel_conversion,
        preview_funnel,
    ),
    components(
        schemas(
            CreateFunnelRequest,
            FunnelStepInput,
            FunnelDefinition,
            FunnelStepDefinition,
            FunnelSummary,
            FunnelPage,
            PreviewFunnelRequest,
            ConversionReport,
            StepReport,
            Percentage,
            ProblemDetails,
        )
    ),
    tags(
        (name = "Funnels", description = "Funnel definitions and conversion reports")
    )
)]
pub struct FunnelApiDoc;
