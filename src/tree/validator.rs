use crate::database::entities::layer_groups;
use crate::errors::{CatalogError, CatalogResult};
use crate::services::validation::ValidationService;

use super::GroupIndex;

/// A proposed create (`id == None`) or update of a layer group.
#[derive(Debug, Clone)]
pub struct GroupCandidate<'a> {
    pub id: Option<i32>,
    pub project_id: i32,
    pub parent_group_id: Option<i32>,
    pub color: Option<&'a str>,
}

/// Tree-related fields of a candidate that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGroup {
    pub parent_group_id: Option<i32>,
    pub color: String,
}

/// Validate a candidate group against the current tree.
///
/// `parent` is the stored row for `candidate.parent_group_id` (`None` when
/// the lookup found nothing) and `project_groups` indexes the groups of the
/// parent's project. Checks run in a fixed order: parent exists, parent is
/// in the same project, the new link closes no cycle, color is well formed.
pub fn validate_group(
    candidate: &GroupCandidate<'_>,
    parent: Option<&layer_groups::Model>,
    project_groups: &GroupIndex,
) -> CatalogResult<ValidatedGroup> {
    if let Some(parent_id) = candidate.parent_group_id {
        let parent = parent
            .filter(|p| p.id == parent_id)
            .ok_or_else(|| CatalogError::not_found("layer group", parent_id))?;

        if parent.project_id != candidate.project_id {
            return Err(CatalogError::CrossProject(format!(
                "parent group {} belongs to project {}, not project {}",
                parent.id, parent.project_id, candidate.project_id
            )));
        }

        // New groups have no id yet and cannot be anyone's ancestor
        if let Some(id) = candidate.id {
            if parent.id == id {
                return Err(CatalogError::CyclicReference(format!(
                    "group {} cannot be its own parent",
                    id
                )));
            }
            if project_groups.ancestors(parent.id)?.contains(&id) {
                return Err(CatalogError::CyclicReference(format!(
                    "group {} is an ancestor of group {}; making it the parent would create a cycle",
                    id, parent.id
                )));
            }
        }
    }

    let color = ValidationService::resolve_color(candidate.color)?;

    Ok(ValidatedGroup {
        parent_group_id: candidate.parent_group_id,
        color,
    })
}
