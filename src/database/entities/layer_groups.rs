use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "layer_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub display_order: i32,
    pub fold_state: String,
    pub parent_group_id: Option<i32>,
    pub color: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentGroupId",
        to = "Column::Id"
    )]
    ParentGroup,
    #[sea_orm(has_many = "super::layers::Entity")]
    Layers,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_top_level(&self) -> bool {
        self.parent_group_id.is_none()
    }

    /// Stored fold state, falling back to collapsed for unknown values
    pub fn get_fold_state(&self) -> FoldState {
        FoldState::from_str(&self.fold_state).unwrap_or_default()
    }
}

/// Whether a group's children start expanded in the layer panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldState {
    #[serde(alias = "open")]
    Expanded,
    #[default]
    #[serde(alias = "close")]
    Collapsed,
}

impl FoldState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoldState::Expanded => "expanded",
            FoldState::Collapsed => "collapsed",
        }
    }

    /// Parse from storage, accepting the legacy `open`/`close` spellings
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "expanded" | "open" => Some(FoldState::Expanded),
            "collapsed" | "close" => Some(FoldState::Collapsed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_state_conversion() {
        assert_eq!(FoldState::from_str("open"), Some(FoldState::Expanded));
        assert_eq!(FoldState::from_str("close"), Some(FoldState::Collapsed));
        assert_eq!(FoldState::from_str("expanded"), Some(FoldState::Expanded));
        assert_eq!(FoldState::from_str("sideways"), None);
        assert_eq!(FoldState::default().as_str(), "collapsed");
    }

    #[test]
    fn test_fold_state_accepts_legacy_json() {
        let state: FoldState = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(state, FoldState::Expanded);
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"expanded\"");
    }
}
