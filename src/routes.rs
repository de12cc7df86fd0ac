use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    DeckRequest, GenerationRequest, IdeaRequest, OptionSet, OutlineRequest, ProjectStep,
    ScriptRequest,
};
use crate::services::export::export_deck;
use crate::services::ingest::{self, DEFAULT_UPLOAD_NAME, IngestResult, Upload};
use crate::services::pipeline::GenerationPipeline;
use crate::storage::{ObjectStore, ProjectStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<GenerationPipeline>,
    pub objects: Arc<dyn ObjectStore>,
    pub projects: Arc<dyn ProjectStore>,
}

pub fn router(state: AppState) -> Router {
    let files = ServeDir::new(&state.config.storage_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/gen/idea", post(gen_idea))
        .route("/gen/outline", post(gen_outline))
        .route("/gen/script", post(gen_script))
        .route("/gen/deck", post(gen_deck))
        .route("/ingest/upload", post(ingest_upload))
        .route("/export", post(export))
        .route("/images/concepts", post(concepts))
        .route("/projects/:owner_id", get(list_projects).post(create_project))
        .route("/projects/:owner_id/:project_id", get(get_project))
        .route("/projects/:owner_id/:project_id/steps/:step", post(save_step))
        .nest_service("/files", files)
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn generate(state: &AppState, request: GenerationRequest) -> Result<Json<OptionSet>, ApiError> {
    request.validate()?;
    let set = state.pipeline.generate(&request).await?;
    Ok(Json(set))
}

async fn gen_idea(State(state): State<AppState>, Json(req): Json<IdeaRequest>) -> Result<Json<OptionSet>, ApiError> {
    generate(&state, GenerationRequest::Idea(req)).await
}

async fn gen_outline(
    State(state): State<AppState>,
    Json(req): Json<OutlineRequest>,
) -> Result<Json<OptionSet>, ApiError> {
    generate(&state, GenerationRequest::Outline(req)).await
}

async fn gen_script(
    State(state): State<AppState>,
    Json(req): Json<ScriptRequest>,
) -> Result<Json<OptionSet>, ApiError> {
    generate(&state, GenerationRequest::Script(req)).await
}

async fn gen_deck(State(state): State<AppState>, Json(req): Json<DeckRequest>) -> Result<Json<OptionSet>, ApiError> {
    generate(&state, GenerationRequest::DeckBuild(req)).await
}

async fn ingest_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResult>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut language = String::from("en");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(DEFAULT_UPLOAD_NAME)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            "language" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                if !value.trim().is_empty() {
                    language = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::Validation("missing multipart field 'file'".into()))?;
    let result = ingest::ingest_upload(
        &state.pipeline,
        Upload {
            filename,
            language,
            bytes,
        },
    )
    .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    deck_json: Map<String, Value>,
    format: String,
}

async fn export(State(state): State<AppState>, Json(req): Json<ExportRequest>) -> Result<Json<Value>, ApiError> {
    let url = export_deck(state.objects.as_ref(), &req.deck_json, &req.format).await?;
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
struct ConceptRequest {
    prompt: String,
}

async fn concepts(State(state): State<AppState>, Json(req): Json<ConceptRequest>) -> Result<Json<Value>, ApiError> {
    if !state.config.enable_image_gen {
        return Ok(Json(json!({ "enabled": false })));
    }
    if req.prompt.trim().is_empty() {
        return Err(ApiError::Validation("prompt must not be blank".into()));
    }
    // No image model is wired up yet; hand back the placeholder concept.
    let image = format!("{}/concepts/sample1.png", state.config.public_base_url);
    Ok(Json(json!({ "enabled": true, "images": [image] })))
}

async fn list_projects(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let projects = state.projects.list(&owner_id).await?;
    let summaries: Vec<_> = projects.iter().map(|p| p.summary()).collect();
    Ok(Json(json!({ "projects": summaries })))
}

#[derive(Debug, Default, Deserialize)]
struct CreateProjectRequest {
    #[serde(default)]
    title: Option<String>,
}

async fn create_project(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Value>, ApiError> {
    let title = req.title.filter(|t| !t.trim().is_empty());
    let project = state.projects.create(&owner_id, title).await?;
    Ok(Json(json!({ "project_id": project.project_id, "project": project })))
}

async fn get_project(
    State(state): State<AppState>,
    Path((owner_id, project_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let project = state
        .projects
        .get(&owner_id, &project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;
    Ok(Json(json!({ "project": project })))
}

async fn save_step(
    State(state): State<AppState>,
    Path((owner_id, project_id, step)): Path<(String, String, String)>,
    Json(data): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let step: ProjectStep = step.parse().map_err(ApiError::Validation)?;
    let project = state
        .projects
        .merge_step(&owner_id, &project_id, step, data)
        .await?;
    Ok(Json(json!({ "ok": true, "project": project })))
}
