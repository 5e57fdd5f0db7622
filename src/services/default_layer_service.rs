use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use tracing::info;

use crate::database::entities::{default_layers, layer_groups, layers, projects};
use crate::errors::{CatalogError, CatalogResult};
use crate::services::catalog_query::{load_default_layer_views, DefaultLayerView};
use crate::services::conflict_on_unique;

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultLayerInput {
    #[serde(alias = "layer")]
    pub layer_id: i32,
    #[serde(default = "visible_by_default")]
    pub visible_default: bool,
}

/// Project-level visibility overrides for layers
#[derive(Clone)]
pub struct DefaultLayerService {
    db: DatabaseConnection,
}

impl DefaultLayerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn set_default_layer(
        &self,
        project_id: i32,
        input: DefaultLayerInput,
    ) -> CatalogResult<default_layers::Model> {
        if projects::Entity::find_by_id(project_id).one(&self.db).await?.is_none() {
            return Err(CatalogError::not_found("project", project_id));
        }

        let (layer, group) = layers::Entity::find_by_id(input.layer_id)
            .find_also_related(layer_groups::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer", input.layer_id))?;
        let group = group.ok_or_else(|| {
            CatalogError::Structural(format!(
                "layer {} points at missing group {}",
                layer.id, layer.group_id
            ))
        })?;

        if group.project_id != project_id {
            return Err(CatalogError::CrossProject(format!(
                "layer {} belongs to project {}, not project {}",
                layer.id, group.project_id, project_id
            )));
        }

        let existing = default_layers::Entity::find()
            .filter(default_layers::Column::ProjectId.eq(project_id))
            .filter(default_layers::Column::LayerId.eq(layer.id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(CatalogError::Conflict(format!(
                "layer {} is already a default layer of project {}",
                layer.id, project_id
            )));
        }

        let row = default_layers::ActiveModel {
            project_id: Set(project_id),
            layer_id: Set(layer.id),
            visible_default: Set(input.visible_default),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                format!("layer {} is already a default layer of project {}", layer.id, project_id),
            )
        })?;

        info!("Added layer {} to defaults of project {}", layer.id, project_id);
        Ok(row)
    }

    pub async fn list_default_layers(&self, project_id: i32) -> CatalogResult<Vec<DefaultLayerView>> {
        if projects::Entity::find_by_id(project_id).one(&self.db).await?.is_none() {
            return Err(CatalogError::not_found("project", project_id));
        }
        load_default_layer_views(&self.db, project_id).await
    }

    pub async fn delete_default_layer(&self, id: i32) -> CatalogResult<()> {
        let result = default_layers::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::not_found("default layer", id));
        }
        info!("Deleted default layer {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_default_is_true_when_omitted() {
        let input: DefaultLayerInput = serde_json::from_str(r#"{"layer": 7}"#).unwrap();
        assert_eq!(input.layer_id, 7);
        assert!(input.visible_default);
    }
}
