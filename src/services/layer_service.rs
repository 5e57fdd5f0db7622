use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use crate::database::entities::{default_layers, layer_groups, layers};
use crate::errors::{CatalogError, CatalogResult};
use crate::services::{deserialize_some, ValidationService};

/// Full layer description, used for create and PUT
#[derive(Debug, Clone, Deserialize)]
pub struct LayerInput {
    #[serde(alias = "group")]
    pub group_id: i32,
    pub source_name: String,
    pub display_name: String,
    pub store_name: String,
    #[serde(default)]
    pub initial_visible: bool,
    #[serde(default)]
    pub metadata_ref: Option<String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerPatch {
    #[serde(default, alias = "group")]
    pub group_id: Option<i32>,
    pub source_name: Option<String>,
    pub display_name: Option<String>,
    pub store_name: Option<String>,
    pub initial_visible: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub metadata_ref: Option<Option<String>>,
    pub order: Option<i32>,
}

impl From<LayerInput> for LayerPatch {
    fn from(input: LayerInput) -> Self {
        Self {
            group_id: Some(input.group_id),
            source_name: Some(input.source_name),
            display_name: Some(input.display_name),
            store_name: Some(input.store_name),
            initial_visible: Some(input.initial_visible),
            metadata_ref: Some(input.metadata_ref),
            order: Some(input.order),
        }
    }
}

#[derive(Clone)]
pub struct LayerService {
    db: DatabaseConnection,
}

impl LayerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_layer(&self, input: LayerInput) -> CatalogResult<layers::Model> {
        let source_name = ValidationService::validate_name("source_name", &input.source_name)?;
        let display_name = ValidationService::validate_name("display_name", &input.display_name)?;
        let store_name = ValidationService::validate_name("store_name", &input.store_name)?;
        let metadata_ref = ValidationService::validate_metadata_ref(input.metadata_ref.as_deref())?;

        if layer_groups::Entity::find_by_id(input.group_id).one(&self.db).await?.is_none() {
            return Err(CatalogError::not_found("layer group", input.group_id));
        }

        let now = Utc::now();
        let layer = layers::ActiveModel {
            group_id: Set(input.group_id),
            source_name: Set(source_name),
            display_name: Set(display_name),
            store_name: Set(store_name),
            initial_visible: Set(input.initial_visible),
            metadata_ref: Set(metadata_ref),
            display_order: Set(input.order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Created layer {} '{}' in group {}", layer.id, layer.display_name, layer.group_id);
        Ok(layer)
    }

    pub async fn update_layer(&self, id: i32, patch: LayerPatch) -> CatalogResult<layers::Model> {
        let txn = self.db.begin().await?;

        let existing = layers::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer", id))?;

        let mut active: layers::ActiveModel = existing.clone().into();

        if let Some(group_id) = patch.group_id.filter(|g| *g != existing.group_id) {
            let target = layer_groups::Entity::find_by_id(group_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CatalogError::not_found("layer group", group_id))?;
            let current = layer_groups::Entity::find_by_id(existing.group_id)
                .one(&txn)
                .await?
                .ok_or_else(|| CatalogError::not_found("layer group", existing.group_id))?;

            if target.project_id != current.project_id {
                let pinned = default_layers::Entity::find()
                    .filter(default_layers::Column::LayerId.eq(id))
                    .filter(default_layers::Column::ProjectId.eq(current.project_id))
                    .count(&txn)
                    .await?;
                if pinned > 0 {
                    return Err(CatalogError::CrossProject(format!(
                        "layer {} is a default layer of project {}; remove that entry before moving it to project {}",
                        id, current.project_id, target.project_id
                    )));
                }
            }
            active.group_id = Set(group_id);
        }

        if let Some(value) = &patch.source_name {
            active.source_name = Set(ValidationService::validate_name("source_name", value)?);
        }
        if let Some(value) = &patch.display_name {
            active.display_name = Set(ValidationService::validate_name("display_name", value)?);
        }
        if let Some(value) = &patch.store_name {
            active.store_name = Set(ValidationService::validate_name("store_name", value)?);
        }
        if let Some(visible) = patch.initial_visible {
            active.initial_visible = Set(visible);
        }
        if let Some(metadata_ref) = &patch.metadata_ref {
            active.metadata_ref = Set(ValidationService::validate_metadata_ref(metadata_ref.as_deref())?);
        }
        if let Some(order) = patch.order {
            active.display_order = Set(order);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!("Updated layer {}", id);
        Ok(updated)
    }

    pub async fn delete_layer(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        if layers::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("layer", id));
        }

        let removed = default_layers::Entity::delete_many()
            .filter(default_layers::Column::LayerId.eq(id))
            .exec(&txn)
            .await?;
        layers::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            "Deleted layer {} and {} default-layer entries",
            id, removed.rows_affected
        );
        Ok(())
    }

    pub async fn get_layer(&self, id: i32) -> CatalogResult<layers::Model> {
        layers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer", id))
    }
}
