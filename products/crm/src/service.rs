//! Transactional facade over the deal operations for callers holding a pool.

use std::sync::Arc;

use entity::{deal, deal_activity, loss_reason};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::instrument;
use uuid::Uuid;

use crate::deals::{self, CreateDealRequest};
use crate::error::DealResult;
use crate::orm::OrmDealStore;
use crate::pipeline::{self, PipelineWithStages};
use crate::report::{self, PipelineReport};
use crate::transition::{TransitionOutcome, TransitionRequest, apply_transition};

/// Database-backed entry point for the HTTP and CLI layers.
///
/// Every mutating call runs in its own transaction: readers see a deal's new
/// stage, status and activity entries together or not at all.
#[derive(Clone, Debug)]
pub struct DealService {
    db: Arc<DatabaseConnection>,
}

impl DealService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    #[instrument(
        name = "deals.transition",
        skip_all,
        fields(deal_id = %request.deal_id, stage = ?request.stage_label, status = ?request.status_label)
    )]
    pub async fn transition(&self, request: TransitionRequest) -> DealResult<TransitionOutcome> {
        let txn = self.db.begin().await?;
        let outcome = apply_transition(&OrmDealStore::new(&txn), &request).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    #[instrument(name = "deals.create", skip_all, fields(pipeline = %request.pipeline_name))]
    pub async fn create_deal(&self, request: CreateDealRequest) -> DealResult<deal::Model> {
        let txn = self.db.begin().await?;
        let deal = deals::create_deal(&OrmDealStore::new(&txn), request).await?;
        txn.commit().await?;
        Ok(deal)
    }

    #[instrument(name = "deals.find", skip(self))]
    pub async fn deal(&self, deal_id: Uuid) -> DealResult<deal::Model> {
        deals::find_deal(&OrmDealStore::new(self.db()), deal_id).await
    }

    #[instrument(name = "deals.activities", skip(self))]
    pub async fn activities(&self, deal_id: Uuid) -> DealResult<Vec<deal_activity::Model>> {
        deals::deal_activities(&OrmDealStore::new(self.db()), deal_id).await
    }

    #[instrument(name = "pipelines.ensure", skip(self))]
    pub async fn ensure_pipeline(&self, name: &str) -> DealResult<PipelineWithStages> {
        let txn = self.db.begin().await?;
        let pipeline = pipeline::ensure_pipeline(&OrmDealStore::new(&txn), name).await?;
        txn.commit().await?;
        Ok(pipeline)
    }

    #[instrument(name = "pipelines.find", skip(self))]
    pub async fn pipeline(&self, name: &str) -> DealResult<Option<PipelineWithStages>> {
        pipeline::pipeline_by_name(&OrmDealStore::new(self.db()), name).await
    }

    #[instrument(name = "pipelines.add_loss_reason", skip(self))]
    pub async fn add_loss_reason(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> DealResult<loss_reason::Model> {
        let txn = self.db.begin().await?;
        let reason = pipeline::add_loss_reason(&OrmDealStore::new(&txn), pipeline_id, name).await?;
        txn.commit().await?;
        Ok(reason)
    }

    #[instrument(name = "pipelines.loss_reasons", skip(self))]
    pub async fn loss_reasons(&self, pipeline_id: Uuid) -> DealResult<Vec<loss_reason::Model>> {
        pipeline::loss_reasons(&OrmDealStore::new(self.db()), pipeline_id).await
    }

    #[instrument(name = "pipelines.report", skip(self))]
    pub async fn report(&self, pipeline_id: Uuid) -> DealResult<PipelineReport> {
        report::pipeline_report(&OrmDealStore::new(self.db()), pipeline_id).await
    }
}
