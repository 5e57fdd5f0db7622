pub mod default_layers;
pub mod health;
pub mod layer_groups;
pub mod layers;
pub mod projects;
