use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub short_key: String,
    pub name: String,
    pub logo_small_url: Option<String>,
    pub logo_full_url: Option<String>,
    pub zoom_level: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub panel_visible: bool,
    pub base_map: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::layer_groups::Entity")]
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

impl Model {
    /// Get the base map as an enum for type safety
    pub fn get_base_map(&self) -> Option<BaseMap> {
        BaseMap::from_str(&self.base_map)
    }
}

/// Basemap providers the viewer knows how to render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseMap {
    #[default]
    Streetmap,
    CartodbPositron,
    Otm,
    Bw,
    Terrain,
    EsriPhysical,
    EsriImagery,
}

impl BaseMap {
    pub const ALL: [BaseMap; 7] = [
        BaseMap::Streetmap,
        BaseMap::CartodbPositron,
        BaseMap::Otm,
        BaseMap::Bw,
        BaseMap::Terrain,
        BaseMap::EsriPhysical,
        BaseMap::EsriImagery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseMap::Streetmap => "streetmap",
            BaseMap::CartodbPositron => "cartodb_positron",
            BaseMap::Otm => "otm",
            BaseMap::Bw => "bw",
            BaseMap::Terrain => "terrain",
            BaseMap::EsriPhysical => "esri_physical",
            BaseMap::EsriImagery => "esri_imagery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        BaseMap::ALL.into_iter().find(|b| b.as_str() == s)
    }
}
