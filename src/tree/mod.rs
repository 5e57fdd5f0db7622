//! In-memory layer-group tree
//!
//! Groups and layers are fetched in bulk and assembled here, so the rules
//! that keep the tree well formed live in plain functions that never touch
//! the store:
//!
//! - [`index::GroupIndex`]: parent/children adjacency for one project
//! - [`validator`]: write-time checks (parent exists, same project, no cycle,
//!   color)
//! - [`serializer`]: nested views with deterministic sibling order and a
//!   traversal guard against corrupted parent links

pub mod index;
pub mod serializer;
pub mod validator;

pub use index::GroupIndex;
pub use serializer::{GroupView, LayerView, TreeSnapshot};
pub use validator::{validate_group, GroupCandidate, ValidatedGroup};

use std::cmp::Ordering;

use crate::database::entities::{layer_groups, layers};

/// Sibling order for groups: `order` ascending, then name, then id.
pub fn compare_groups(a: &layer_groups::Model, b: &layer_groups::Model) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sibling order for layers: `order` ascending, then display name, then id.
pub fn compare_layers(a: &layers::Model, b: &layers::Model) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::database::entities::{layer_groups, layers};

    pub fn group(id: i32, project_id: i32, name: &str, order: i32, parent: Option<i32>) -> layer_groups::Model {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        layer_groups::Model {
            id,
            project_id,
            name: name.to_string(),
            display_order: order,
            fold_state: "collapsed".to_string(),
            parent_group_id: parent,
            color: "#E3E3E3".to_string(),
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn layer(id: i32, group_id: i32, display_name: &str, order: i32) -> layers::Model {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        layers::Model {
            id,
            group_id,
            source_name: format!("i2d:{}", display_name.to_lowercase()),
            display_name: display_name.to_string(),
            store_name: "i2d".to_string(),
            initial_visible: false,
            metadata_ref: None,
            display_order: order,
            created_at: ts,
            updated_at: ts,
        }
    }
}
