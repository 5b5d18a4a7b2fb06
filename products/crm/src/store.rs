//! Storage seam for the deal pipeline.
//!
//! Every operation in this crate talks to persistence through [`DealStore`].
//! The sea-orm backend runs against any connection (normally a transaction
//! opened by [`DealService`](crate::DealService)); the in-memory backend in
//! [`memory`](crate::memory) backs unit tests.

use async_trait::async_trait;
use entity::{deal, deal_activity, loss_reason, pipeline, stage};
use uuid::Uuid;

use crate::error::StoreResult;

/// Fields a single deal update may touch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DealPatch {
    pub stage_id: Option<Uuid>,
    pub status: Option<deal::Status>,
    /// `Some(None)` clears the reference.
    pub loss_reason_id: Option<Option<Uuid>>,
}

#[derive(Clone, Debug)]
pub struct NewActivity {
    pub deal_id: Uuid,
    pub kind: deal_activity::Kind,
    pub message: String,
    pub created_by: Option<Uuid>,
}

#[derive(Clone, Debug)]
pub struct NewDeal {
    pub title: String,
    pub pipeline_id: Uuid,
    pub stage_id: Uuid,
    pub value_cents: i64,
    pub owner_id: Option<Uuid>,
    pub source: Option<String>,
}

/// Count and summed value of the deals sharing one stage and status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DealTotals {
    pub stage_id: Uuid,
    pub status: deal::Status,
    pub deals: u64,
    pub value_cents: i64,
}

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn find_deal(&self, id: Uuid) -> StoreResult<Option<deal::Model>>;

    async fn insert_deal(&self, deal: NewDeal) -> StoreResult<deal::Model>;

    /// Deal totals of a pipeline grouped by stage and status, one entry per
    /// non-empty group. Sums that leave the `i64` range are an error.
    async fn deal_totals(&self, pipeline_id: Uuid) -> StoreResult<Vec<DealTotals>>;

    /// Apply `patch` and bump `updated_at`. Fails with
    /// [`StoreError::Missing`](crate::StoreError::Missing) for unknown ids.
    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<deal::Model>;

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<pipeline::Model>>;

    async fn find_pipeline_by_name(&self, name: &str) -> StoreResult<Option<pipeline::Model>>;

    async fn create_pipeline(&self, name: &str) -> StoreResult<pipeline::Model>;

    async fn find_stage(&self, id: Uuid) -> StoreResult<Option<stage::Model>>;

    /// Case-insensitive lookup; with duplicates the lowest position wins.
    async fn find_stage_by_name(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<stage::Model>>;

    /// Stages ordered by position.
    async fn list_stages(&self, pipeline_id: Uuid) -> StoreResult<Vec<stage::Model>>;

    async fn max_stage_position(&self, pipeline_id: Uuid) -> StoreResult<Option<i32>>;

    async fn create_stage(
        &self,
        pipeline_id: Uuid,
        name: &str,
        position: i32,
    ) -> StoreResult<stage::Model>;

    async fn find_loss_reason(&self, id: Uuid) -> StoreResult<Option<loss_reason::Model>>;

    /// Loss reasons ordered by name.
    async fn list_loss_reasons(&self, pipeline_id: Uuid) -> StoreResult<Vec<loss_reason::Model>>;

    async fn create_loss_reason(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<loss_reason::Model>;

    async fn create_activity(&self, activity: NewActivity) -> StoreResult<deal_activity::Model>;

    /// Activities for a deal, oldest first.
    async fn list_activities(&self, deal_id: Uuid) -> StoreResult<Vec<deal_activity::Model>>;
}
