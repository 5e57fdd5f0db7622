use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "layers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    /// Layer name in the map server
    pub source_name: String,
    pub display_name: String,
    /// Store/workspace name in the map server
    pub store_name: String,
    pub initial_visible: bool,
    /// External metadata-catalog id or URL
    pub metadata_ref: Option<String>,
    pub display_order: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::layer_groups::Entity",
        from = "Column::GroupId",
        to = "super::layer_groups::Column::Id"
    )]
    LayerGroups,
    #[sea_orm(has_many = "super::default_layers::Entity")]
    DefaultLayers,
}

impl Related<super::layer_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LayerGroups.def()
    }
}

impl Related<super::default_layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DefaultLayers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
