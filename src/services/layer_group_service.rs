use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::database::entities::{default_layers, layer_groups, layers, projects, FoldState};
use crate::errors::{CatalogError, CatalogResult};
use crate::services::catalog_query::load_project_groups;
use crate::services::{deserialize_some, ValidationService};
use crate::tree::{compare_groups, validate_group, GroupCandidate, GroupIndex};

/// Full group description, used for create and PUT
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInput {
    #[serde(alias = "project")]
    pub project_id: i32,
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub fold_state: Option<String>,
    #[serde(default)]
    pub parent_group: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial group update.
///
/// `parent_group` and `color` distinguish an absent key from `null`: a null
/// parent moves the group to the top level, a null color resets it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPatch {
    #[serde(default, alias = "project")]
    pub project_id: Option<i32>,
    pub name: Option<String>,
    pub order: Option<i32>,
    pub fold_state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_group: Option<Option<i32>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
}

impl From<GroupInput> for GroupPatch {
    fn from(input: GroupInput) -> Self {
        Self {
            project_id: Some(input.project_id),
            name: Some(input.name),
            order: Some(input.order),
            fold_state: Some(input.fold_state.unwrap_or_default()),
            parent_group: Some(input.parent_group),
            color: Some(input.color),
        }
    }
}

fn resolve_fold_state(value: Option<&str>) -> CatalogResult<FoldState> {
    match value {
        Some(v) if !v.is_empty() => ValidationService::validate_fold_state(v),
        _ => Ok(FoldState::default()),
    }
}

#[derive(Clone)]
pub struct LayerGroupService {
    db: DatabaseConnection,
}

impl LayerGroupService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_group(&self, input: GroupInput) -> CatalogResult<layer_groups::Model> {
        let name = ValidationService::validate_name("name", &input.name)?;
        let fold_state = resolve_fold_state(input.fold_state.as_deref())?;

        let txn = self.db.begin().await?;

        if projects::Entity::find_by_id(input.project_id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("project", input.project_id));
        }

        let candidate = GroupCandidate {
            id: None,
            project_id: input.project_id,
            parent_group_id: input.parent_group,
            color: input.color.as_deref(),
        };
        let validated = check_candidate(&txn, &candidate).await?;

        let now = Utc::now();
        let group = layer_groups::ActiveModel {
            project_id: Set(input.project_id),
            name: Set(name),
            display_order: Set(input.order),
            fold_state: Set(fold_state.as_str().to_string()),
            parent_group_id: Set(validated.parent_group_id),
            color: Set(validated.color),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            "Created layer group {} '{}' in project {}",
            group.id, group.name, group.project_id
        );
        Ok(group)
    }

    pub async fn update_group(&self, id: i32, patch: GroupPatch) -> CatalogResult<layer_groups::Model> {
        let txn = self.db.begin().await?;

        let existing = layer_groups::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer group", id))?;

        if let Some(project_id) = patch.project_id {
            if project_id != existing.project_id {
                return Err(CatalogError::field(
                    "project_id",
                    "a layer group cannot be moved to another project",
                ));
            }
        }

        let parent_group_id = patch.parent_group.unwrap_or(existing.parent_group_id);
        let color = match &patch.color {
            None => Some(existing.color.as_str()),
            Some(color) => color.as_deref(),
        };
        let candidate = GroupCandidate {
            id: Some(id),
            project_id: existing.project_id,
            parent_group_id,
            color,
        };
        let validated = check_candidate(&txn, &candidate).await?;

        let mut active: layer_groups::ActiveModel = existing.into();
        if let Some(name) = &patch.name {
            active.name = Set(ValidationService::validate_name("name", name)?);
        }
        if let Some(order) = patch.order {
            active.display_order = Set(order);
        }
        if let Some(fold_state) = &patch.fold_state {
            active.fold_state = Set(resolve_fold_state(Some(fold_state))?.as_str().to_string());
        }
        active.parent_group_id = Set(validated.parent_group_id);
        active.color = Set(validated.color);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!("Updated layer group {}", id);
        Ok(updated)
    }

    /// Delete a group together with its subgroups, their layers and any
    /// default-layer rows pointing at those layers.
    pub async fn delete_group(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        let group = layer_groups::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer group", id))?;

        let groups = load_project_groups(&txn, group.project_id).await?;
        let mut doomed = GroupIndex::new(&groups).descendants(id)?;
        doomed.push(id);

        let layer_ids: Vec<i32> = layers::Entity::find()
            .filter(layers::Column::GroupId.is_in(doomed.clone()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();

        default_layers::Entity::delete_many()
            .filter(default_layers::Column::LayerId.is_in(layer_ids.clone()))
            .exec(&txn)
            .await?;
        layers::Entity::delete_many()
            .filter(layers::Column::Id.is_in(layer_ids.clone()))
            .exec(&txn)
            .await?;
        layer_groups::Entity::delete_many()
            .filter(layer_groups::Column::Id.is_in(doomed.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            "Deleted layer group {} with {} subgroups and {} layers",
            id,
            doomed.len() - 1,
            layer_ids.len()
        );
        Ok(())
    }

    pub async fn get_group(&self, id: i32) -> CatalogResult<layer_groups::Model> {
        layer_groups::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer group", id))
    }

    /// Groups of a project that `group_id` could be re-parented under: all of
    /// them except the group itself and its descendants.
    pub async fn eligible_parents(
        &self,
        project_id: i32,
        group_id: Option<i32>,
    ) -> CatalogResult<Vec<layer_groups::Model>> {
        let txn = self.db.begin().await?;

        if projects::Entity::find_by_id(project_id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("project", project_id));
        }
        let groups = load_project_groups(&txn, project_id).await?;
        txn.commit().await?;

        let Some(group_id) = group_id else {
            return Ok(groups);
        };

        let index = GroupIndex::new(&groups);
        if !index.contains(group_id) {
            return Err(CatalogError::not_found("layer group", group_id));
        }
        let mut excluded = index.descendants(group_id)?;
        excluded.push(group_id);

        let mut eligible: Vec<_> = groups
            .into_iter()
            .filter(|g| !excluded.contains(&g.id))
            .collect();
        eligible.sort_by(compare_groups);
        Ok(eligible)
    }
}

/// Load what the tree validator needs for `candidate` and run it.
async fn check_candidate<C: ConnectionTrait>(
    conn: &C,
    candidate: &GroupCandidate<'_>,
) -> CatalogResult<crate::tree::ValidatedGroup> {
    let (parent, index) = match candidate.parent_group_id {
        Some(parent_id) => {
            let parent = layer_groups::Entity::find_by_id(parent_id).one(conn).await?;
            let index = match &parent {
                Some(p) => GroupIndex::new(&load_project_groups(conn, p.project_id).await?),
                None => GroupIndex::default(),
            };
            (parent, index)
        }
        None => (None, GroupIndex::default()),
    };

    validate_group(candidate, parent.as_ref(), &index).map_err(|err| {
        debug!("Rejected layer group write: {}", err);
        err
    })
}
