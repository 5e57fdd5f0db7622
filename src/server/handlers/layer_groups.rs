use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::database::entities::{layer_groups, FoldState};
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::server::middleware::{AdminAccess, ApiPath, ApiQuery, ValidatedJson};
use crate::services::{GroupInput, GroupPatch};
use crate::tree::GroupView;

/// Flat group representation, without layers or subgroups
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub order: i32,
    pub fold_state: FoldState,
    pub parent_group: Option<i32>,
    pub color: String,
}

impl From<&layer_groups::Model> for GroupSummary {
    fn from(group: &layer_groups::Model) -> Self {
        Self {
            id: group.id,
            project_id: group.project_id,
            name: group.name.clone(),
            order: group.display_order,
            fold_state: group.get_fold_state(),
            parent_group: group.parent_group_id,
            color: group.color.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    pub project: Option<i32>,
    #[serde(default)]
    pub top_level: bool,
}

pub async fn list_groups(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GroupListQuery>,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    let groups = state
        .catalog()
        .list_groups(query.project, query.top_level)
        .await?;
    Ok(Json(groups.iter().map(GroupSummary::from).collect()))
}

pub async fn create_group(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ValidatedJson(payload): ValidatedJson<GroupInput>,
) -> Result<(StatusCode, Json<GroupSummary>), ApiError> {
    let group = state.groups().create_group(payload).await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(GroupSummary::from(&group))))
}

pub async fn get_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<GroupView>, ApiError> {
    Ok(Json(state.catalog().group_tree(id).await?))
}

pub async fn replace_group(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<GroupInput>,
) -> Result<Json<GroupSummary>, ApiError> {
    let group = state.groups().update_group(id, payload.into()).await?;
    state.cache.invalidate_all();
    Ok(Json(GroupSummary::from(&group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<GroupPatch>,
) -> Result<Json<GroupSummary>, ApiError> {
    let group = state.groups().update_group(id, payload).await?;
    state.cache.invalidate_all();
    Ok(Json(GroupSummary::from(&group)))
}

pub async fn delete_group(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.groups().delete_group(id).await?;
    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
