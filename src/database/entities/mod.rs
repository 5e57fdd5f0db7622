pub mod default_layers;
pub mod layer_groups;
pub mod layers;
pub mod projects;

pub use layer_groups::FoldState;
pub use projects::BaseMap;
