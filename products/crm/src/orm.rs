//! sea-orm backed [`DealStore`], scoped to whatever connection or transaction
//! it borrows.

use async_trait::async_trait;
use chrono::Utc;
use entity::{deal, deal_activity, loss_reason, pipeline, stage};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{DealPatch, DealStore, DealTotals, NewActivity, NewDeal};

/// [`DealStore`] over any sea-orm connection or transaction.
pub struct OrmDealStore<'c, C> {
    conn: &'c C,
}

impl<'c, C> OrmDealStore<'c, C>
where
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }
}

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    stage_id: Uuid,
    status: deal::Status,
    deals: i64,
    value_cents: i64,
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

#[async_trait]
impl<C> DealStore for OrmDealStore<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_deal(&self, id: Uuid) -> StoreResult<Option<deal::Model>> {
        Ok(deal::Entity::find_by_id(id).one(self.conn).await?)
    }

    async fn insert_deal(&self, new: NewDeal) -> StoreResult<deal::Model> {
        let timestamp = now();
        let model = deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new.title),
            pipeline_id: Set(new.pipeline_id),
            stage_id: Set(new.stage_id),
            status: Set(deal::Status::Open),
            loss_reason_id: Set(None),
            value_cents: Set(new.value_cents),
            owner_id: Set(new.owner_id),
            source: Set(new.source),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        };
        Ok(model.insert(self.conn).await?)
    }

    async fn deal_totals(&self, pipeline_id: Uuid) -> StoreResult<Vec<DealTotals>> {
        // Postgres widens SUM(bigint) to numeric; cast back to decode an i64.
        let counted = Func::count(Expr::col((deal::Entity, deal::Column::Id)));
        let summed = Func::cast_as(
            Func::sum(Expr::col((deal::Entity, deal::Column::ValueCents))),
            Alias::new("BIGINT"),
        );
        let rows = deal::Entity::find()
            .select_only()
            .column(deal::Column::StageId)
            .column(deal::Column::Status)
            .column_as(SimpleExpr::from(counted), "deals")
            .column_as(SimpleExpr::from(summed), "value_cents")
            .filter(deal::Column::PipelineId.eq(pipeline_id))
            .group_by(deal::Column::StageId)
            .group_by(deal::Column::Status)
            .into_model::<TotalsRow>()
            .all(self.conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| DealTotals {
                stage_id: row.stage_id,
                status: row.status,
                deals: u64::try_from(row.deals).unwrap_or_default(),
                value_cents: row.value_cents,
            })
            .collect())
    }

    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<deal::Model> {
        let existing = deal::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or(StoreError::Missing { entity: "deal", id })?;
        let mut active: deal::ActiveModel = existing.into();
        if let Some(stage_id) = patch.stage_id {
            active.stage_id = Set(stage_id);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(loss_reason_id) = patch.loss_reason_id {
            active.loss_reason_id = Set(loss_reason_id);
        }
        active.updated_at = Set(now());
        Ok(active.update(self.conn).await?)
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<pipeline::Model>> {
        Ok(pipeline::Entity::find_by_id(id).one(self.conn).await?)
    }

    async fn find_pipeline_by_name(&self, name: &str) -> StoreResult<Option<pipeline::Model>> {
        Ok(pipeline::Entity::find()
            .filter(pipeline::Column::Name.eq(name))
            .one(self.conn)
            .await?)
    }

    async fn create_pipeline(&self, name: &str) -> StoreResult<pipeline::Model> {
        let model = pipeline::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(now()),
        };
        Ok(model.insert(self.conn).await?)
    }

    async fn find_stage(&self, id: Uuid) -> StoreResult<Option<stage::Model>> {
        Ok(stage::Entity::find_by_id(id).one(self.conn).await?)
    }

    async fn find_stage_by_name(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<stage::Model>> {
        let lowered = Func::lower(Expr::col((stage::Entity, stage::Column::Name)));
        Ok(stage::Entity::find()
            .filter(stage::Column::PipelineId.eq(pipeline_id))
            .filter(Expr::expr(lowered).eq(name.to_lowercase()))
            .order_by_asc(stage::Column::Position)
            .one(self.conn)
            .await?)
    }

    async fn list_stages(&self, pipeline_id: Uuid) -> StoreResult<Vec<stage::Model>> {
        Ok(stage::Entity::find()
            .filter(stage::Column::PipelineId.eq(pipeline_id))
            .order_by_asc(stage::Column::Position)
            .all(self.conn)
            .await?)
    }

    async fn max_stage_position(&self, pipeline_id: Uuid) -> StoreResult<Option<i32>> {
        let top = stage::Entity::find()
            .filter(stage::Column::PipelineId.eq(pipeline_id))
            .order_by_desc(stage::Column::Position)
            .one(self.conn)
            .await?;
        Ok(top.map(|stage| stage.position))
    }

    async fn create_stage(
        &self,
        pipeline_id: Uuid,
        name: &str,
        position: i32,
    ) -> StoreResult<stage::Model> {
        let model = stage::ActiveModel {
            id: Set(Uuid::new_v4()),
            pipeline_id: Set(pipeline_id),
            name: Set(name.to_string()),
            position: Set(position),
            created_at: Set(now()),
        };
        Ok(model.insert(self.conn).await?)
    }

    async fn find_loss_reason(&self, id: Uuid) -> StoreResult<Option<loss_reason::Model>> {
        Ok(loss_reason::Entity::find_by_id(id).one(self.conn).await?)
    }

    async fn list_loss_reasons(&self, pipeline_id: Uuid) -> StoreResult<Vec<loss_reason::Model>> {
        Ok(loss_reason::Entity::find()
            .filter(loss_reason::Column::PipelineId.eq(pipeline_id))
            .order_by_asc(loss_reason::Column::Name)
            .all(self.conn)
            .await?)
    }

    async fn create_loss_reason(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<loss_reason::Model> {
        let model = loss_reason::ActiveModel {
            id: Set(Uuid::new_v4()),
            pipeline_id: Set(pipeline_id),
            name: Set(name.to_string()),
            created_at: Set(now()),
        };
        Ok(model.insert(self.conn).await?)
    }

    async fn create_activity(&self, activity: NewActivity) -> StoreResult<deal_activity::Model> {
        let model = deal_activity::ActiveModel {
            id: Set(Uuid::new_v4()),
            deal_id: Set(activity.deal_id),
            kind: Set(activity.kind),
            message: Set(activity.message),
            created_at: Set(now()),
            created_by: Set(activity.created_by),
        };
        Ok(model.insert(self.conn).await?)
    }

    async fn list_activities(&self, deal_id: Uuid) -> StoreResult<Vec<deal_activity::Model>> {
        Ok(deal_activity::Entity::find()
            .filter(deal_activity::Column::DealId.eq(deal_id))
            .order_by_asc(deal_activity::Column::CreatedAt)
            .all(self.conn)
            .await?)
    }
}
