use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum Pipelines {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Stages {
    Table,
    Id,
    PipelineId,
    Name,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum LossReasons {
    Table,
    Id,
    PipelineId,
    Name,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pipelines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pipelines::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Pipelines::Name)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Pipelines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Stage names are matched case-insensitively by the application; no
        // unique index backs that, so concurrent find-or-create may duplicate.
        manager
            .create_table(
                Table::create()
                    .table(Stages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Stages::PipelineId).uuid().not_null())
                    .col(ColumnDef::new(Stages::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Stages::Position).integer().not_null())
                    .col(
                        ColumnDef::new(Stages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stages_pipeline")
                            .from(Stages::Table, Stages::PipelineId)
                            .to(Pipelines::Table, Pipelines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stages_pipeline_position")
                    .table(Stages::Table)
                    .col(Stages::PipelineId)
                    .col(Stages::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LossReasons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LossReasons::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LossReasons::PipelineId).uuid().not_null())
                    .col(ColumnDef::new(LossReasons::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(LossReasons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loss_reasons_pipeline")
                            .from(LossReasons::Table, LossReasons::PipelineId)
                            .to(Pipelines::Table, Pipelines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_loss_reasons_pipeline")
                    .table(LossReasons::Table)
                    .col(LossReasons::PipelineId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LossReasons::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stages::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pipelines::Table).if_exists().to_owned())
            .await
    }
}
