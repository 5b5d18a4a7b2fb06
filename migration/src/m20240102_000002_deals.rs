use sea_orm_migration::prelude::*;

use crate::m20240101_000001_pipelines::{LossReasons, Pipelines, Stages};

#[derive(DeriveIden)]
enum Deals {
    Table,
    Id,
    Title,
    PipelineId,
    StageId,
    Status,
    LossReasonId,
    ValueCents,
    OwnerId,
    Source,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DealActivities {
    Table,
    Id,
    DealId,
    Kind,
    Message,
    CreatedAt,
    CreatedBy,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deals::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Deals::PipelineId).uuid().not_null())
                    .col(ColumnDef::new(Deals::StageId).uuid().not_null())
                    .col(
                        ColumnDef::new(Deals::Status)
                            .string_len(16)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(ColumnDef::new(Deals::LossReasonId).uuid().null())
                    .col(
                        ColumnDef::new(Deals::ValueCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Deals::OwnerId).uuid().null())
                    .col(ColumnDef::new(Deals::Source).string_len(64).null())
                    .col(
                        ColumnDef::new(Deals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_pipeline")
                            .from(Deals::Table, Deals::PipelineId)
                            .to(Pipelines::Table, Pipelines::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_stage")
                            .from(Deals::Table, Deals::StageId)
                            .to(Stages::Table, Stages::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_loss_reason")
                            .from(Deals::Table, Deals::LossReasonId)
                            .to(LossReasons::Table, LossReasons::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_deals_pipeline", Deals::PipelineId),
            ("idx_deals_stage", Deals::StageId),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Deals::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(DealActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DealActivities::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DealActivities::DealId).uuid().not_null())
                    .col(ColumnDef::new(DealActivities::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(DealActivities::Message).text().not_null())
                    .col(
                        ColumnDef::new(DealActivities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DealActivities::CreatedBy).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_activities_deal")
                            .from(DealActivities::Table, DealActivities::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deal_activities_deal_created")
                    .table(DealActivities::Table)
                    .col(DealActivities::DealId)
                    .col(DealActivities::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(DealActivities::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Deals::Table).if_exists().to_owned())
            .await
    }
}
