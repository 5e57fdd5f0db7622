use axum::{extract::State, http::StatusCode, response::Json};

use crate::errors::ApiError;
use crate::server::app::AppState;
use crate::server::middleware::{AdminAccess, ApiPath, ApiQuery, ValidatedJson};
use crate::services::{LayerFilter, LayerInput, LayerPatch};
use crate::tree::LayerView;

pub async fn list_layers(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<LayerFilter>,
) -> Result<Json<Vec<LayerView>>, ApiError> {
    let rows = state.catalog().layers_for(filter).await?;
    Ok(Json(rows.iter().map(LayerView::from).collect()))
}

pub async fn create_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ValidatedJson(payload): ValidatedJson<LayerInput>,
) -> Result<(StatusCode, Json<LayerView>), ApiError> {
    let layer = state.layers().create_layer(payload).await?;
    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(LayerView::from(&layer))))
}

pub async fn get_layer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<LayerView>, ApiError> {
    let layer = state.layers().get_layer(id).await?;
    Ok(Json(LayerView::from(&layer)))
}

pub async fn replace_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<LayerInput>,
) -> Result<Json<LayerView>, ApiError> {
    let layer = state.layers().update_layer(id, payload.into()).await?;
    state.cache.invalidate_all();
    Ok(Json(LayerView::from(&layer)))
}

pub async fn update_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(payload): ValidatedJson<LayerPatch>,
) -> Result<Json<LayerView>, ApiError> {
    let layer = state.layers().update_layer(id, payload).await?;
    state.cache.invalidate_all();
    Ok(Json(LayerView::from(&layer)))
}

pub async fn delete_layer(
    State(state): State<AppState>,
    _admin: AdminAccess,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    state.layers().delete_layer(id).await?;
    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
