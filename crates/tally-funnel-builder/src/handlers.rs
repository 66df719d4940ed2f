use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_analytics_funnels::FunnelDefinition;
use tally_core::error_builder::{not_found, validation_failed};
use tally_core::problemdetails::Problem;
use tally_core::ProblemDetails;
use utoipa::ToSchema;

use crate::catalog;
use crate::confirm::ForceDelete;
use crate::editor::{EditorOptions, FunnelEditor};
use crate::error::{EditorError, ValidationError};
use crate::metadata::BasicMetadata;
use crate::sink::FunnelSink;
use crate::templates::{find_template, TEMPLATES};

pub struct AppState {
    pub options: EditorOptions,
    pub sink: Arc<dyn FunnelSink>,
}

impl AppState {
    pub fn new(options: EditorOptions, sink: Arc<dyn FunnelSink>) -> Self {
        Self { options, sink }
    }
}

impl From<EditorError> for Problem {
    fn from(error: EditorError) -> Self {
        match error {
            EditorError::StepNotFound(id) => not_found()
                .title("Step Not Found")
                .detail(format!("Step {} does not exist in this draft", id))
                .build(),
            EditorError::Validation(ValidationError::MissingFields(fields)) => {
                let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                validation_failed()
                    .title("Incomplete Funnel")
                    .detail(ValidationError::MissingFields(fields.clone()).to_string())
                    .value("missing_fields", names)
                    .build()
            }
            EditorError::Validation(ValidationError::Keyword(e)) => validation_failed()
                .title("Invalid Keyword")
                .detail(e.to_string())
                .value("rule", e.rule())
                .build(),
            EditorError::Validation(e) => validation_failed()
                .title("Invalid Funnel Draft")
                .detail(e.to_string())
                .build(),
            EditorError::Persistence(e) => e.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Step types in funnel order
    pub steps: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StepTypeResponse {
    pub step_type: String,
    pub name: String,
    pub description: String,
    pub tracked_event_name: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StepCatalogResponse {
    pub step_types: Vec<StepTypeResponse>,
    pub limits: EditorOptions,
}

/// Build a funnel from a template and extra step types in one request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DraftFunnelRequest {
    pub template: Option<String>,
    /// Appended after the template's steps
    #[serde(default)]
    pub add_steps: Vec<String>,
    /// 1-based positions of template steps to drop
    #[serde(default)]
    pub remove_steps: Vec<usize>,
    pub name: String,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub business_goal: Option<String>,
    pub budget: Option<u64>,
}

/// Predefined funnel templates
#[utoipa::path(
    get,
    path = "/funnel-templates",
    responses(
        (status = 200, description = "Available templates", body = Vec<TemplateResponse>)
    ),
    tag = "Funnel Builder"
)]
pub async fn list_templates() -> Json<Vec<TemplateResponse>> {
    Json(
        TEMPLATES
            .iter()
            .map(|t| TemplateResponse {
                id: t.id.to_string(),
                name: t.name.to_string(),
                description: t.description.to_string(),
                steps: t.steps.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
    )
}

/// Catalogued step types and editor limits
#[utoipa::path(
    get,
    path = "/funnel-step-types",
    responses(
        (status = 200, description = "Step catalogue", body = StepCatalogResponse)
    ),
    tag = "Funnel Builder"
)]
pub async fn list_step_types(State(state): State<Arc<AppState>>) -> Json<StepCatalogResponse> {
    let step_types = catalog::all_step_types()
        .into_iter()
        .map(|info| StepTypeResponse {
            step_type: info.step_type.to_string(),
            name: info.name.to_string(),
            description: info.description.to_string(),
            tracked_event_name: info.tracked_event_name.to_string(),
            icon: info.icon.to_string(),
            color: info.color.to_string(),
        })
        .collect();

    Json(StepCatalogResponse {
        step_types,
        limits: state.options,
    })
}

fn build_draft(options: EditorOptions, request: &DraftFunnelRequest) -> Result<FunnelEditor, Problem> {
    let mut editor = FunnelEditor::new(options);

    if let Some(key) = request.template.as_deref() {
        let template = find_template(key).ok_or_else(|| {
            not_found()
                .title("Template Not Found")
                .detail(format!("No funnel template named '{}'", key))
                .build()
        })?;
        editor.initialize(Some(template))?;
    }

    editor.remove_positions(&request.remove_steps, &ForceDelete)?;

    for step_type in &request.add_steps {
        editor.add_step(step_type)?;
    }

    Ok(editor)
}

/// Save a funnel assembled by the step editor
#[utoipa::path(
    post,
    path = "/funnel-drafts",
    request_body = DraftFunnelRequest,
    responses(
        (status = 201, description = "Funnel created", body = FunnelDefinition),
        (status = 400, description = "Incomplete or invalid draft", body = ProblemDetails),
        (status = 404, description = "Unknown template", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "Funnel Builder"
)]
pub async fn save_draft(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DraftFunnelRequest>,
) -> Result<impl IntoResponse, Problem> {
    let editor = build_draft(state.options, &request)?;
    let metadata = BasicMetadata {
        name: request.name,
        description: request.description,
        target_audience: request.target_audience,
        business_goal: request.business_goal,
        budget: request.budget,
    };

    let stored = editor.persist(&metadata, state.sink.as_ref()).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/funnel-templates", get(list_templates))
        .route("/funnel-step-types", get(list_step_types))
        .route("/funnel-drafts", post(save_draft))
}

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(list_templates, list_step_types, save_draft),
    components(schemas(
        TemplateResponse,
        StepTypeResponse,
        StepCatalogResponse,
        DraftFunnelRequest,
        EditorOptions,
        ProblemDetails
    )),
    tags(
        (name = "Funnel Builder", description = "Step catalogue and funnel drafting")
    )
)]
pub struct BuilderApiDoc;
