use crate::{deal_activity, loss_reason, pipeline, stage};
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(indexed)]
    pub pipeline_id: Uuid,
    #[sea_orm(indexed)]
    pub stage_id: Uuid,
    pub status: Status,
    pub loss_reason_id: Option<Uuid>,
    pub value_cents: i64,
    pub owner_id: Option<Uuid>,
    pub source: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "pipeline::Entity",
        from = "Column::PipelineId",
        to = "pipeline::Column::Id"
    )]
    Pipeline,
    #[sea_orm(
        belongs_to = "stage::Entity",
        from = "Column::StageId",
        to = "stage::Column::Id"
    )]
    Stage,
    #[sea_orm(
        belongs_to = "loss_reason::Entity",
        from = "Column::LossReasonId",
        to = "loss_reason::Column::Id",
        on_delete = "SetNull"
    )]
    LossReason,
    #[sea_orm(has_many = "deal_activity::Entity")]
    Activity,
}

impl Related<pipeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pipeline.def()
    }
}

impl Related<stage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stage.def()
    }
}

impl Related<loss_reason::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LossReason.def()
    }
}

impl Related<deal_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[sea_orm(string_value = "OPEN")]
    Open,
    #[sea_orm(string_value = "WON")]
    Won,
    #[sea_orm(string_value = "LOST")]
    Lost,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::Won => "WON",
            Status::Lost => "LOST",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
