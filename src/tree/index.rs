use std::collections::{HashMap, HashSet, VecDeque};

use crate::database::entities::layer_groups;
use crate::errors::{CatalogError, CatalogResult};

/// Parent and children adjacency for a set of groups, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct GroupIndex {
    parents: HashMap<i32, Option<i32>>,
    children: HashMap<i32, Vec<i32>>,
}

impl GroupIndex {
    pub fn new<'a>(groups: impl IntoIterator<Item = &'a layer_groups::Model>) -> Self {
        let mut index = GroupIndex::default();
        for group in groups {
            index.parents.insert(group.id, group.parent_group_id);
            if let Some(parent_id) = group.parent_group_id {
                index.children.entry(parent_id).or_default().push(group.id);
            }
        }
        for ids in index.children.values_mut() {
            ids.sort_unstable();
        }
        index
    }

    pub fn contains(&self, id: i32) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent_of(&self, id: i32) -> Option<i32> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn children_of(&self, id: i32) -> &[i32] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids on the path from `id`'s parent up to its root, nearest first.
    ///
    /// Fails with `Structural` if the stored parent links loop or point
    /// outside the index.
    pub fn ancestors(&self, id: i32) -> CatalogResult<Vec<i32>> {
        let mut path = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parent_of(id);

        while let Some(ancestor) = current {
            if !seen.insert(ancestor) {
                return Err(CatalogError::Structural(format!(
                    "parent chain of group {} loops through group {}",
                    id, ancestor
                )));
            }
            if !self.contains(ancestor) {
                return Err(CatalogError::Structural(format!(
                    "group {} has an ancestor {} outside its project",
                    id, ancestor
                )));
            }
            path.push(ancestor);
            current = self.parent_of(ancestor);
        }

        Ok(path)
    }

    /// Every group below `id`, breadth first; `id` itself is excluded.
    pub fn descendants(&self, id: i32) -> CatalogResult<Vec<i32>> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue: VecDeque<i32> = self.children_of(id).iter().copied().collect();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                return Err(CatalogError::Structural(format!(
                    "group {} is reachable more than once below group {}",
                    next, id
                )));
            }
            found.push(next);
            queue.extend(self.children_of(next).iter().copied());
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::group;

    #[test]
    fn test_ancestors_nearest_first() {
        let groups = vec![
            group(1, 1, "root", 0, None),
            group(2, 1, "mid", 0, Some(1)),
            group(3, 1, "leaf", 0, Some(2)),
        ];
        let index = GroupIndex::new(&groups);
        assert_eq!(index.ancestors(3).unwrap(), vec![2, 1]);
        assert!(index.ancestors(1).unwrap().is_empty());
    }

    #[test]
    fn test_descendants_collects_whole_subtree() {
        let groups = vec![
            group(1, 1, "root", 0, None),
            group(2, 1, "a", 0, Some(1)),
            group(3, 1, "b", 0, Some(1)),
            group(4, 1, "a1", 0, Some(2)),
            group(5, 1, "other", 0, None),
        ];
        let index = GroupIndex::new(&groups);
        let mut below = index.descendants(1).unwrap();
        below.sort_unstable();
        assert_eq!(below, vec![2, 3, 4]);
        assert!(index.descendants(5).unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_cycle_is_structural() {
        let groups = vec![group(1, 1, "a", 0, Some(2)), group(2, 1, "b", 0, Some(1))];
        let index = GroupIndex::new(&groups);
        assert!(matches!(index.ancestors(1), Err(CatalogError::Structural(_))));
        assert!(matches!(index.descendants(1), Err(CatalogError::Structural(_))));
    }

    #[test]
    fn test_dangling_parent_is_structural() {
        let groups = vec![group(1, 1, "orphan", 0, Some(99))];
        let index = GroupIndex::new(&groups);
        assert!(matches!(index.ancestors(1), Err(CatalogError::Structural(_))));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut groups = vec![group(0, 1, "g0", 0, None)];
        for i in 1..20_000 {
            groups.push(group(i, 1, "g", 0, Some(i - 1)));
        }
        let index = GroupIndex::new(&groups);
        assert_eq!(index.ancestors(19_999).unwrap().len(), 19_999);
        assert_eq!(index.descendants(0).unwrap().len(), 19_999);
    }
}
