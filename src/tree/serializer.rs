use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::database::entities::{layer_groups, layers, FoldState};
use crate::errors::{CatalogError, CatalogResult};

use super::{compare_groups, compare_layers};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerView {
    pub id: i32,
    pub group_id: i32,
    pub source_name: String,
    pub display_name: String,
    pub store_name: String,
    pub initial_visible: bool,
    pub metadata_ref: Option<String>,
    pub order: i32,
}

impl From<&layers::Model> for LayerView {
    fn from(layer: &layers::Model) -> Self {
        Self {
            id: layer.id,
            group_id: layer.group_id,
            source_name: layer.source_name.clone(),
            display_name: layer.display_name.clone(),
            store_name: layer.store_name.clone(),
            initial_visible: layer.initial_visible,
            metadata_ref: layer.metadata_ref.clone(),
            order: layer.display_order,
        }
    }
}

/// A group with its layers and subgroups, as served to the layer panel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: i32,
    pub name: String,
    pub order: i32,
    pub fold_state: FoldState,
    pub color: String,
    pub parent_group: Option<i32>,
    pub layers: Vec<LayerView>,
    pub subgroups: Vec<GroupView>,
}

/// Groups and layers of one read, indexed for tree assembly.
///
/// Built once from bulk-fetched rows; children and layers are pre-sorted so
/// every serialization of the same snapshot yields the same order.
#[derive(Debug, Default)]
pub struct TreeSnapshot {
    groups: HashMap<i32, layer_groups::Model>,
    children: HashMap<i32, Vec<i32>>,
    layers: HashMap<i32, Vec<layers::Model>>,
    roots: Vec<i32>,
}

impl TreeSnapshot {
    pub fn new(groups: Vec<layer_groups::Model>, layer_rows: Vec<layers::Model>) -> Self {
        let mut by_parent: HashMap<i32, Vec<&layer_groups::Model>> = HashMap::new();
        let mut roots: Vec<&layer_groups::Model> = Vec::new();
        for group in &groups {
            match group.parent_group_id {
                Some(parent_id) => by_parent.entry(parent_id).or_default().push(group),
                None => roots.push(group),
            }
        }

        let children = by_parent
            .into_iter()
            .map(|(parent_id, mut kids)| {
                kids.sort_by(|a, b| compare_groups(a, b));
                (parent_id, kids.into_iter().map(|g| g.id).collect())
            })
            .collect();

        roots.sort_by(|a, b| compare_groups(a, b));
        let roots = roots.into_iter().map(|g| g.id).collect();

        let mut layers: HashMap<i32, Vec<layers::Model>> = HashMap::new();
        for layer in layer_rows {
            layers.entry(layer.group_id).or_default().push(layer);
        }
        for group_layers in layers.values_mut() {
            group_layers.sort_by(compare_layers);
        }

        Self {
            groups: groups.into_iter().map(|g| (g.id, g)).collect(),
            children,
            layers,
            roots,
        }
    }

    fn children_of(&self, id: i32) -> &[i32] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn layer_views(&self, group_id: i32) -> Vec<LayerView> {
        self.layers
            .get(&group_id)
            .map(|rows| rows.iter().map(LayerView::from).collect())
            .unwrap_or_default()
    }

    /// Serialize the given root groups, siblings in display order.
    pub fn serialize(&self, root_ids: &[i32]) -> CatalogResult<Vec<GroupView>> {
        let mut roots: Vec<&layer_groups::Model> = root_ids
            .iter()
            .map(|id| {
                self.groups.get(id).ok_or_else(|| {
                    CatalogError::Structural(format!("group {} is not part of this read", id))
                })
            })
            .collect::<CatalogResult<_>>()?;
        roots.sort_by(|a, b| compare_groups(a, b));

        let mut visited = HashSet::new();
        roots
            .into_iter()
            .map(|root| self.build(root.id, &mut visited))
            .collect()
    }

    /// Serialize a single group and everything below it.
    pub fn serialize_group(&self, id: i32) -> CatalogResult<GroupView> {
        if !self.groups.contains_key(&id) {
            return Err(CatalogError::not_found("layer group", id));
        }
        self.build(id, &mut HashSet::new())
    }

    /// Serialize the whole forest from its top-level groups, failing if any
    /// group cannot be reached from a root (a parent loop detached from the
    /// top level, or a dangling parent link).
    pub fn serialize_all(&self) -> CatalogResult<Vec<GroupView>> {
        let mut visited = HashSet::new();
        let views = self
            .roots
            .iter()
            .map(|&root| self.build(root, &mut visited))
            .collect::<CatalogResult<Vec<_>>>()?;

        if visited.len() != self.groups.len() {
            let mut unreachable: Vec<i32> = self
                .groups
                .keys()
                .filter(|id| !visited.contains(*id))
                .copied()
                .collect();
            unreachable.sort_unstable();
            return Err(CatalogError::Structural(format!(
                "groups {:?} are not reachable from any top-level group",
                unreachable
            )));
        }

        Ok(views)
    }

    /// Assemble one subtree without recursion: a pre-order walk records the
    /// nodes (tripping on any revisit), then views are built in reverse so
    /// children always exist before their parent.
    fn build(&self, root: i32, visited: &mut HashSet<i32>) -> CatalogResult<GroupView> {
        let mut preorder = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(CatalogError::Structural(format!(
                    "group {} was reached twice while walking from group {}; parent links form a cycle",
                    id, root
                )));
            }
            preorder.push(id);
            stack.extend(self.children_of(id).iter().rev());
        }

        let mut built: HashMap<i32, GroupView> = HashMap::with_capacity(preorder.len());
        for &id in preorder.iter().rev() {
            let group = self.groups.get(&id).ok_or_else(|| {
                CatalogError::Structural(format!("group {} is not part of this read", id))
            })?;

            let subgroups = self
                .children_of(id)
                .iter()
                .map(|child| {
                    built.remove(child).ok_or_else(|| {
                        CatalogError::Structural(format!(
                            "subgroup {} of group {} was not assembled",
                            child, id
                        ))
                    })
                })
                .collect::<CatalogResult<Vec<_>>>()?;

            built.insert(
                id,
                GroupView {
                    id,
                    name: group.name.clone(),
                    order: group.display_order,
                    fold_state: group.get_fold_state(),
                    color: group.color.clone(),
                    parent_group: group.parent_group_id,
                    layers: self.layer_views(id),
                    subgroups,
                },
            );
        }

        built.remove(&root).ok_or_else(|| {
            CatalogError::Structural(format!("group {} was not assembled", root))
        })
    }
}
