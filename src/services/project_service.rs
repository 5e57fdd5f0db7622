use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use crate::database::entities::{default_layers, layer_groups, layers, projects};
use crate::errors::{CatalogError, CatalogResult};
use crate::services::{conflict_on_unique, deserialize_some, ValidationService};

fn default_zoom_level() -> f64 {
    6.0
}

fn default_panel_visible() -> bool {
    true
}

/// Full project description, used for create and PUT
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub short_key: String,
    pub name: String,
    #[serde(default)]
    pub logo_small_url: Option<String>,
    #[serde(default)]
    pub logo_full_url: Option<String>,
    #[serde(default = "default_zoom_level")]
    pub zoom_level: f64,
    pub center_x: f64,
    pub center_y: f64,
    #[serde(default = "default_panel_visible")]
    pub panel_visible: bool,
    #[serde(default)]
    pub base_map: Option<String>,
}

/// Partial project update; logo URLs can be cleared with an explicit `null`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub short_key: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub logo_small_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub logo_full_url: Option<Option<String>>,
    pub zoom_level: Option<f64>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub panel_visible: Option<bool>,
    pub base_map: Option<String>,
}

impl From<ProjectInput> for ProjectPatch {
    fn from(input: ProjectInput) -> Self {
        Self {
            short_key: Some(input.short_key),
            name: Some(input.name),
            logo_small_url: Some(input.logo_small_url),
            logo_full_url: Some(input.logo_full_url),
            zoom_level: Some(input.zoom_level),
            center_x: Some(input.center_x),
            center_y: Some(input.center_y),
            panel_visible: Some(input.panel_visible),
            base_map: Some(input.base_map.unwrap_or_default()),
        }
    }
}

#[derive(Clone)]
pub struct ProjectService {
    db: DatabaseConnection,
}

impl ProjectService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_project(&self, input: ProjectInput) -> CatalogResult<projects::Model> {
        let short_key = ValidationService::validate_short_key(&input.short_key)?;
        let name = ValidationService::validate_name("name", &input.name)?;
        let logo_small_url = ValidationService::validate_url("logo_small_url", input.logo_small_url.as_deref())?;
        let logo_full_url = ValidationService::validate_url("logo_full_url", input.logo_full_url.as_deref())?;
        let zoom_level = ValidationService::validate_zoom_level(input.zoom_level)?;
        let center_x = ValidationService::validate_coordinate("center_x", input.center_x)?;
        let center_y = ValidationService::validate_coordinate("center_y", input.center_y)?;
        let base_map = match input.base_map.as_deref() {
            Some(value) if !value.is_empty() => ValidationService::validate_base_map(value)?,
            _ => Default::default(),
        };

        if find_by_short_key(&self.db, &short_key).await?.is_some() {
            return Err(CatalogError::Conflict(format!(
                "A project with short key '{}' already exists",
                short_key
            )));
        }

        let now = Utc::now();
        let project = projects::ActiveModel {
            short_key: Set(short_key.clone()),
            name: Set(name),
            logo_small_url: Set(logo_small_url),
            logo_full_url: Set(logo_full_url),
            zoom_level: Set(zoom_level),
            center_x: Set(center_x),
            center_y: Set(center_y),
            panel_visible: Set(input.panel_visible),
            base_map: Set(base_map.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let project = project.insert(&self.db).await.map_err(|e| {
            conflict_on_unique(e, format!("A project with short key '{}' already exists", short_key))
        })?;

        info!("Created project {} ({})", project.id, project.short_key);
        Ok(project)
    }

    /// Apply a partial update. The short-key checks and the write share one
    /// transaction, so a group created concurrently cannot slip in between.
    pub async fn update_project(&self, id: i32, patch: ProjectPatch) -> CatalogResult<projects::Model> {
        let txn = self.db.begin().await?;

        let project = projects::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("project", id))?;
        let current_key = project.short_key.clone();
        let mut active: projects::ActiveModel = project.into();

        if let Some(short_key) = patch.short_key {
            let short_key = ValidationService::validate_short_key(&short_key)?;
            if short_key != current_key {
                let group_count = layer_groups::Entity::find()
                    .filter(layer_groups::Column::ProjectId.eq(id))
                    .count(&txn)
                    .await?;
                if group_count > 0 {
                    return Err(CatalogError::field(
                        "short_key",
                        "short_key cannot change once the project has layer groups",
                    ));
                }
                if find_by_short_key(&txn, &short_key).await?.is_some() {
                    return Err(CatalogError::Conflict(format!(
                        "A project with short key '{}' already exists",
                        short_key
                    )));
                }
                active.short_key = Set(short_key);
            }
        }

        if let Some(name) = patch.name {
            active.name = Set(ValidationService::validate_name("name", &name)?);
        }
        if let Some(url) = patch.logo_small_url {
            active.logo_small_url = Set(ValidationService::validate_url("logo_small_url", url.as_deref())?);
        }
        if let Some(url) = patch.logo_full_url {
            active.logo_full_url = Set(ValidationService::validate_url("logo_full_url", url.as_deref())?);
        }
        if let Some(zoom) = patch.zoom_level {
            active.zoom_level = Set(ValidationService::validate_zoom_level(zoom)?);
        }
        if let Some(x) = patch.center_x {
            active.center_x = Set(ValidationService::validate_coordinate("center_x", x)?);
        }
        if let Some(y) = patch.center_y {
            active.center_y = Set(ValidationService::validate_coordinate("center_y", y)?);
        }
        if let Some(visible) = patch.panel_visible {
            active.panel_visible = Set(visible);
        }
        if let Some(base_map) = patch.base_map {
            let base_map = if base_map.is_empty() {
                Default::default()
            } else {
                ValidationService::validate_base_map(&base_map)?
            };
            active.base_map = Set(base_map.as_str().to_string());
        }

        active.updated_at = Set(Utc::now());
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| conflict_on_unique(e, "short key already in use"))?;
        txn.commit().await?;

        info!("Updated project {}", id);
        Ok(updated)
    }

    /// Delete a project with its groups, layers and default-layer rows.
    pub async fn delete_project(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        if projects::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("project", id));
        }

        let group_ids: Vec<i32> = layer_groups::Entity::find()
            .filter(layer_groups::Column::ProjectId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let layer_ids: Vec<i32> = layers::Entity::find()
            .filter(layers::Column::GroupId.is_in(group_ids.clone()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();

        default_layers::Entity::delete_many()
            .filter(
                default_layers::Column::ProjectId
                    .eq(id)
                    .or(default_layers::Column::LayerId.is_in(layer_ids.clone())),
            )
            .exec(&txn)
            .await?;
        layers::Entity::delete_many()
            .filter(layers::Column::Id.is_in(layer_ids.clone()))
            .exec(&txn)
            .await?;
        layer_groups::Entity::delete_many()
            .filter(layer_groups::Column::Id.is_in(group_ids.clone()))
            .exec(&txn)
            .await?;
        projects::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(
            "Deleted project {} with {} groups and {} layers",
            id,
            group_ids.len(),
            layer_ids.len()
        );
        Ok(())
    }

    pub async fn get_project(&self, id: i32) -> CatalogResult<projects::Model> {
        projects::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("project", id))
    }

    pub async fn get_project_by_short_key(&self, short_key: &str) -> CatalogResult<projects::Model> {
        find_by_short_key(&self.db, short_key)
            .await?
            .ok_or_else(|| CatalogError::not_found("project", short_key))
    }

    pub async fn list_projects(&self) -> CatalogResult<Vec<projects::Model>> {
        Ok(projects::Entity::find()
            .order_by_asc(projects::Column::ShortKey)
            .all(&self.db)
            .await?)
    }
}

async fn find_by_short_key<C: ConnectionTrait>(
    conn: &C,
    short_key: &str,
) -> CatalogResult<Option<projects::Model>> {
    Ok(projects::Entity::find()
        .filter(projects::Column::ShortKey.eq(short_key))
        .one(conn)
        .await?)
}
