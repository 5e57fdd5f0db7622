pub use sea_orm_migration::prelude::*;

mod m20260105_000001_create_catalog_tables;
mod m20260112_000002_add_layer_group_color;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260105_000001_create_catalog_tables::Migration),
            Box::new(m20260112_000002_add_layer_group_color::Migration),
        ]
    }
}
