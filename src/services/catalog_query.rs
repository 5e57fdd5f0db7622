use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::database::entities::{default_layers, layer_groups, layers, projects};
use crate::errors::{CatalogError, CatalogResult};
use crate::tree::{compare_groups, compare_layers, GroupView, LayerView, TreeSnapshot};

/// Optional filters for layer lookups; `None` leaves a dimension open.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LayerFilter {
    #[serde(alias = "project")]
    pub project_id: Option<i32>,
    #[serde(alias = "group")]
    pub group_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultLayerView {
    pub id: i32,
    pub layer: LayerView,
    pub visible_default: bool,
}

/// Project with its layer tree and default-layer rows
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: projects::Model,
    pub layer_groups: Vec<GroupView>,
    pub default_layers: Vec<DefaultLayerView>,
}

/// Read side of the catalog.
///
/// Every read that feeds the serializer runs inside one transaction, so a
/// concurrent delete is either fully visible or not at all.
#[derive(Clone)]
pub struct CatalogQuery {
    db: DatabaseConnection,
}

impl CatalogQuery {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn groups_for_project(
        &self,
        project_id: i32,
        top_level_only: bool,
    ) -> CatalogResult<Vec<layer_groups::Model>> {
        let mut groups = load_project_groups(&self.db, project_id).await?;
        if top_level_only {
            groups.retain(|g| g.is_top_level());
        }
        Ok(groups)
    }

    /// Flat group listing; without a project every group is returned.
    pub async fn list_groups(
        &self,
        project_id: Option<i32>,
        top_level_only: bool,
    ) -> CatalogResult<Vec<layer_groups::Model>> {
        let mut query = layer_groups::Entity::find();
        if let Some(project_id) = project_id {
            query = query.filter(layer_groups::Column::ProjectId.eq(project_id));
        }
        if top_level_only {
            query = query.filter(layer_groups::Column::ParentGroupId.is_null());
        }

        let mut groups = query
            .order_by_asc(layer_groups::Column::ProjectId)
            .all(&self.db)
            .await?;
        groups.sort_by(|a, b| a.project_id.cmp(&b.project_id).then_with(|| compare_groups(a, b)));
        Ok(groups)
    }

    pub async fn layers_for(&self, filter: LayerFilter) -> CatalogResult<Vec<layers::Model>> {
        load_layers(&self.db, filter).await
    }

    /// Bulk-load a project's groups and layers from one snapshot.
    pub async fn project_snapshot(&self, project_id: i32) -> CatalogResult<TreeSnapshot> {
        let txn = self.db.begin().await?;
        let snapshot = snapshot_in(&txn, project_id).await?;
        txn.commit().await?;
        Ok(snapshot)
    }

    /// Nested top-level groups of a project.
    pub async fn project_tree(&self, project_id: i32) -> CatalogResult<Vec<GroupView>> {
        self.require_project(project_id).await?;
        self.project_snapshot(project_id).await?.serialize_all()
    }

    /// Nested view of one group and everything below it.
    pub async fn group_tree(&self, group_id: i32) -> CatalogResult<GroupView> {
        let txn = self.db.begin().await?;
        let group = layer_groups::Entity::find_by_id(group_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("layer group", group_id))?;
        let snapshot = snapshot_in(&txn, group.project_id).await?;
        txn.commit().await?;

        snapshot.serialize_group(group_id)
    }

    pub async fn project_detail(&self, project: projects::Model) -> CatalogResult<ProjectDetail> {
        let txn = self.db.begin().await?;
        let snapshot = snapshot_in(&txn, project.id).await?;
        let default_layers = load_default_layer_views(&txn, project.id).await?;
        txn.commit().await?;

        Ok(ProjectDetail {
            layer_groups: snapshot.serialize_all()?,
            default_layers,
            project,
        })
    }

    pub async fn require_project(&self, project_id: i32) -> CatalogResult<projects::Model> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("project", project_id))
    }
}

async fn snapshot_in<C: ConnectionTrait>(conn: &C, project_id: i32) -> CatalogResult<TreeSnapshot> {
    let groups = load_project_groups(conn, project_id).await?;
    let layer_rows = load_layers(
        conn,
        LayerFilter {
            project_id: Some(project_id),
            group_id: None,
        },
    )
    .await?;
    Ok(TreeSnapshot::new(groups, layer_rows))
}

pub(crate) async fn load_project_groups<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> CatalogResult<Vec<layer_groups::Model>> {
    let mut groups = layer_groups::Entity::find()
        .filter(layer_groups::Column::ProjectId.eq(project_id))
        .all(conn)
        .await?;
    groups.sort_by(compare_groups);
    Ok(groups)
}

pub(crate) async fn load_layers<C: ConnectionTrait>(
    conn: &C,
    filter: LayerFilter,
) -> CatalogResult<Vec<layers::Model>> {
    let mut query = layers::Entity::find();
    if let Some(project_id) = filter.project_id {
        query = query
            .inner_join(layer_groups::Entity)
            .filter(layer_groups::Column::ProjectId.eq(project_id));
    }
    if let Some(group_id) = filter.group_id {
        query = query.filter(layers::Column::GroupId.eq(group_id));
    }

    let mut rows = query.all(conn).await?;
    rows.sort_by(compare_layers);
    Ok(rows)
}

pub(crate) async fn load_default_layer_views<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> CatalogResult<Vec<DefaultLayerView>> {
    let rows = default_layers::Entity::find()
        .filter(default_layers::Column::ProjectId.eq(project_id))
        .find_also_related(layers::Entity)
        .all(conn)
        .await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for (row, layer) in rows {
        let layer = layer.ok_or_else(|| {
            CatalogError::Structural(format!(
                "default layer {} points at missing layer {}",
                row.id, row.layer_id
            ))
        })?;
        pairs.push((row, layer));
    }
    pairs.sort_by(|(_, a), (_, b)| compare_layers(a, b));

    Ok(pairs
        .into_iter()
        .map(|(row, layer)| DefaultLayerView {
            id: row.id,
            layer: LayerView::from(&layer),
            visible_default: row.visible_default,
        })
        .collect())
}
