use axum::{extract::State, http::StatusCode, response::Json};

use crate::database::entities::default_layers;
use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::server::middleware::{AdminAccess, ApiPath, ValidatedJson};
use crate::services::{DefaultLayerInput, DefaultLayerView};

pub async fn list_default_layers(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i32>,
) -> Result<Json<Vec<DefaultLayerView>>, ApiError> {
    Ok(Json(state.default_layers().list_default_layers(project_id).await?))
}

pub async fn create_default_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(project_id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<DefaultLayerInput>,
) -> Result<(StatusCode, Json<default_layers::Model>), ApiError> {
    let row = state
        .default_layers()
        .set_default_layer(project_id, payload)
        .await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn delete_default_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.default_layers().delete_default_layer(id).await?;
    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
