use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(LayerGroups::Table)
                    .add_column(
                        ColumnDef::new(LayerGroups::Color)
                            .string_len(7)
                            .not_null()
                            .default("#E3E3E3"),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(LayerGroups::Table)
                    .drop_column(LayerGroups::Color)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum LayerGroups {
    Table,
    Color,
}
