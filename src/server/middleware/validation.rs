use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::{ApiError, CatalogError, CatalogResult};
use crate::services::{
    DefaultLayerInput, GroupInput, GroupPatch, LayerInput, LayerPatch, ProjectInput, ProjectPatch,
    ValidationService,
};

/// Request-shape checks that run before a body reaches the services
pub trait Validate {
    fn validate(&self) -> CatalogResult<()>;
}

/// JSON body that deserialized and passed [`Validate`]
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// `Path` whose rejection uses the error envelope
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection uses the error envelope
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

fn check_name(field: &str, value: &str) -> CatalogResult<()> {
    ValidationService::validate_name(field, value).map(|_| ())
}

fn check_color(color: Option<&str>) -> CatalogResult<()> {
    ValidationService::resolve_color(color).map(|_| ())
}

fn check_fold_state(fold_state: Option<&str>) -> CatalogResult<()> {
    match fold_state {
        Some(value) if !value.is_empty() => ValidationService::validate_fold_state(value).map(|_| ()),
        _ => Ok(()),
    }
}

impl Validate for ProjectInput {
    fn validate(&self) -> CatalogResult<()> {
        ValidationService::validate_short_key(&self.short_key)?;
        check_name("name", &self.name)?;
        ValidationService::validate_zoom_level(self.zoom_level)?;
        Ok(())
    }
}

impl Validate for ProjectPatch {
    fn validate(&self) -> CatalogResult<()> {
        if let Some(short_key) = &self.short_key {
            ValidationService::validate_short_key(short_key)?;
        }
        if let Some(name) = &self.name {
            check_name("name", name)?;
        }
        if let Some(zoom) = self.zoom_level {
            ValidationService::validate_zoom_level(zoom)?;
        }
        Ok(())
    }
}

impl Validate for GroupInput {
    fn validate(&self) -> CatalogResult<()> {
        check_name("name", &self.name)?;
        check_fold_state(self.fold_state.as_deref())?;
        if self.parent_group.is_none() {
            // With a parent, tree checks decide which error wins
            check_color(self.color.as_deref())?;
        }
        Ok(())
    }
}

impl Validate for GroupPatch {
    fn validate(&self) -> CatalogResult<()> {
        if let Some(name) = &self.name {
            check_name("name", name)?;
        }
        check_fold_state(self.fold_state.as_deref())?;
        Ok(())
    }
}

impl Validate for LayerInput {
    fn validate(&self) -> CatalogResult<()> {
        check_name("source_name", &self.source_name)?;
        check_name("display_name", &self.display_name)?;
        check_name("store_name", &self.store_name)?;
        ValidationService::validate_metadata_ref(self.metadata_ref.as_deref())?;
        Ok(())
    }
}

impl Validate for LayerPatch {
    fn validate(&self) -> CatalogResult<()> {
        for (field, value) in [
            ("source_name", &self.source_name),
            ("display_name", &self.display_name),
            ("store_name", &self.store_name),
        ] {
            if let Some(value) = value {
                check_name(field, value)?;
            }
        }
        if let Some(metadata_ref) = &self.metadata_ref {
            ValidationService::validate_metadata_ref(metadata_ref.as_deref())?;
        }
        Ok(())
    }
}

impl Validate for DefaultLayerInput {
    fn validate(&self) -> CatalogResult<()> {
        if self.layer_id <= 0 {
            return Err(CatalogError::field("layer_id", "layer_id must be a positive id"));
        }
        Ok(())
    }
}
