use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::Value;

use super::layer_groups::GroupSummary;
use crate::database::entities::projects;
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::server::middleware::{AdminAccess, ApiPath, ApiQuery, ValidatedJson};
use crate::services::{LayerFilter, ProjectDetail, ProjectInput, ProjectPatch};
use crate::tree::{GroupView, LayerView};

#[derive(Debug, Deserialize)]
pub struct EligibleParentsQuery {
    pub group: Option<i32>,
}

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<projects::Model>>, ApiError> {
    Ok(Json(state.projects().list_projects().await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ValidatedJson(payload): ValidatedJson<ProjectInput>,
) -> Result<(StatusCode, Json<projects::Model>), ApiError> {
    let project = state.projects().create_project(payload).await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let project = state.projects().get_project(id).await?;
    Ok(Json(state.catalog().project_detail(project).await?))
}

/// Detail lookup used by the map viewer on load; served from the response
/// cache while no write has happened.
pub async fn get_project_by_short_key(
    State(state): State<AppState>,
    ApiPath(short_key): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let key = format!("project:{}", short_key);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let generation = state.cache.generation();
    let project = state.projects().get_project_by_short_key(&short_key).await?;
    let detail = state.catalog().project_detail(project).await?;
    let value = serde_json::to_value(&detail).map_err(|e| {
        ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode project: {}", e))
    })?;

    state.cache.set_if_current(generation, key, value.clone());
    Ok(Json(value))
}

pub async fn replace_project(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<ProjectInput>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = state.projects().update_project(id, payload.into()).await?;
    state.cache.invalidate_all();
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<ProjectPatch>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = state.projects().update_project(id, payload).await?;
    state.cache.invalidate_all();
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.projects().delete_project(id).await?;
    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_groups(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Vec<GroupView>>, ApiError> {
    Ok(Json(state.catalog().project_tree(id).await?))
}

pub async fn list_project_layers(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Vec<LayerView>>, ApiError> {
    let catalog = state.catalog();
    catalog.require_project(id).await?;
    let rows = catalog
        .layers_for(LayerFilter {
            project_id: Some(id),
            group_id: None,
        })
        .await?;
    Ok(Json(rows.iter().map(LayerView::from).collect()))
}

pub async fn eligible_parents(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<EligibleParentsQuery>,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    let groups = state.groups().eligible_parents(id, query.group).await?;
    Ok(Json(groups.iter().map(GroupSummary::from).collect()))
}
