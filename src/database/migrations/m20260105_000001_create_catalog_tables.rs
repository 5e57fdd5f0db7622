use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Projects::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Projects::ShortKey)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Projects::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Projects::LogoSmallUrl).string_len(500).null())
                    .col(ColumnDef::new(Projects::LogoFullUrl).string_len(500).null())
                    .col(
                        ColumnDef::new(Projects::ZoomLevel)
                            .double()
                            .not_null()
                            .default(6.0),
                    )
                    .col(ColumnDef::new(Projects::CenterX).double().not_null())
                    .col(ColumnDef::new(Projects::CenterY).double().not_null())
                    .col(
                        ColumnDef::new(Projects::PanelVisible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Projects::BaseMap)
                            .string_len(50)
                            .not_null()
                            .default("streetmap"),
                    )
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Projects::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LayerGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LayerGroups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LayerGroups::ProjectId).integer().not_null())
                    .col(ColumnDef::new(LayerGroups::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(LayerGroups::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LayerGroups::FoldState)
                            .string_len(10)
                            .not_null()
                            .default("collapsed"),
                    )
                    .col(ColumnDef::new(LayerGroups::ParentGroupId).integer().null())
                    .col(
                        ColumnDef::new(LayerGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LayerGroups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layer_groups_project")
                            .from(LayerGroups::Table, LayerGroups::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layer_groups_parent")
                            .from(LayerGroups::Table, LayerGroups::ParentGroupId)
                            .to(LayerGroups::Table, LayerGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_layer_groups_project_parent")
                    .table(LayerGroups::Table)
                    .col(LayerGroups::ProjectId)
                    .col(LayerGroups::ParentGroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Layers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Layers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Layers::GroupId).integer().not_null())
                    .col(ColumnDef::new(Layers::SourceName).string_len(200).not_null())
                    .col(ColumnDef::new(Layers::DisplayName).string_len(200).not_null())
                    .col(ColumnDef::new(Layers::StoreName).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Layers::InitialVisible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Layers::MetadataRef).string_len(500).null())
                    .col(
                        ColumnDef::new(Layers::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Layers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Layers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layers_group")
                            .from(Layers::Table, Layers::GroupId)
                            .to(LayerGroups::Table, LayerGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_layers_group")
                    .table(Layers::Table)
                    .col(Layers::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DefaultLayers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DefaultLayers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DefaultLayers::ProjectId).integer().not_null())
                    .col(ColumnDef::new(DefaultLayers::LayerId).integer().not_null())
                    .col(
                        ColumnDef::new(DefaultLayers::VisibleDefault)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DefaultLayers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .index(
                        Index::create()
                            .name("idx_default_layers_project_layer")
                            .col(DefaultLayers::ProjectId)
                            .col(DefaultLayers::LayerId)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_default_layers_project")
                            .from(DefaultLayers::Table, DefaultLayers::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_default_layers_layer")
                            .from(DefaultLayers::Table, DefaultLayers::LayerId)
                            .to(Layers::Table, Layers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DefaultLayers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Layers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LayerGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    ShortKey,
    Name,
    LogoSmallUrl,
    LogoFullUrl,
    ZoomLevel,
    CenterX,
    CenterY,
    PanelVisible,
    BaseMap,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LayerGroups {
    Table,
    Id,
    ProjectId,
    Name,
    DisplayOrder,
    FoldState,
    ParentGroupId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Layers {
    Table,
    Id,
    GroupId,
    SourceName,
    DisplayName,
    StoreName,
    InitialVisible,
    MetadataRef,
    DisplayOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DefaultLayers {
    Table,
    Id,
    ProjectId,
    LayerId,
    VisibleDefault,
    CreatedAt,
}
