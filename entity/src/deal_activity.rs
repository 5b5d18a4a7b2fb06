use crate::deal;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit entry attached to a deal.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deal_activities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub deal_id: Uuid,
    pub kind: Kind,
    pub message: String,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "deal::Entity",
        from = "Column::DealId",
        to = "deal::Column::Id",
        on_delete = "Cascade"
    )]
    Deal,
}

impl Related<deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    #[sea_orm(string_value = "CREATED")]
    Created,
    #[sea_orm(string_value = "STAGE_CHANGE")]
    StageChange,
    #[sea_orm(string_value = "STATUS_CHANGE")]
    StatusChange,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Created => "CREATED",
            Kind::StageChange => "STAGE_CHANGE",
            Kind::StatusChange => "STATUS_CHANGE",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
