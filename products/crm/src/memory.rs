//! In-memory [`DealStore`] for tests and local experiments.
//!
//! Mirrors the sea-orm backend closely enough for the processor's contract:
//! case-insensitive stage lookup, position ordering and append-only
//! activities. It also counts writes and can be told to reject them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use entity::{deal, deal_activity, loss_reason, pipeline, stage};
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{DealPatch, DealStore, DealTotals, NewActivity, NewDeal};

#[derive(Debug, Default)]
struct MemoryState {
    pipelines: Vec<pipeline::Model>,
    stages: Vec<stage::Model>,
    loss_reasons: Vec<loss_reason::Model>,
    deals: Vec<deal::Model>,
    activities: Vec<deal_activity::Model>,
    writes: usize,
    reject_writes: bool,
}

#[derive(Debug, Default)]
pub struct MemoryDealStore {
    state: Mutex<MemoryState>,
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

impl MemoryDealStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for_write(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        if state.reject_writes {
            return Err(StoreError::Unavailable(
                "memory store is rejecting writes".into(),
            ));
        }
        state.writes += 1;
        Ok(state)
    }
}

#[async_trait]
impl DealStore for MemoryDealStore {
    async fn find_deal(&self, id: Uuid) -> StoreResult<Option<deal::Model>> {
        Ok(self.lock().deals.iter().find(|d| d.id == id).cloned())
    }

    async fn insert_deal(&self, new: NewDeal) -> StoreResult<deal::Model> {
        let mut state = self.lock_for_write()?;
        let timestamp = now();
        let model = deal::Model {
            id: Uuid::new_v4(),
            title: new.title,
            pipeline_id: new.pipeline_id,
            stage_id: new.stage_id,
            status: deal::Status::Open,
            loss_reason_id: None,
            value_cents: new.value_cents,
            owner_id: new.owner_id,
            source: new.source,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.deals.push(model.clone());
        Ok(model)
    }

    async fn deal_totals(&self, pipeline_id: Uuid) -> StoreResult<Vec<DealTotals>> {
        let state = self.lock();
        let mut totals: Vec<DealTotals> = Vec::new();
        for deal in state.deals.iter().filter(|d| d.pipeline_id == pipeline_id) {
            let index = match totals
                .iter()
                .position(|t| t.stage_id == deal.stage_id && t.status == deal.status)
            {
                Some(index) => index,
                None => {
                    totals.push(DealTotals {
                        stage_id: deal.stage_id,
                        status: deal.status,
                        deals: 0,
                        value_cents: 0,
                    });
                    totals.len() - 1
                }
            };
            let group = &mut totals[index];
            group.deals += 1;
            group.value_cents = group
                .value_cents
                .checked_add(deal.value_cents)
                .ok_or(StoreError::Overflow("deal value sum"))?;
        }
        Ok(totals)
    }

    async fn update_deal(&self, id: Uuid, patch: DealPatch) -> StoreResult<deal::Model> {
        let mut state = self.lock_for_write()?;
        let deal = state
            .deals
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::Missing { entity: "deal", id })?;
        if let Some(stage_id) = patch.stage_id {
            deal.stage_id = stage_id;
        }
        if let Some(status) = patch.status {
            deal.status = status;
        }
        if let Some(loss_reason_id) = patch.loss_reason_id {
            deal.loss_reason_id = loss_reason_id;
        }
        deal.updated_at = now();
        Ok(deal.clone())
    }

    async fn find_pipeline(&self, id: Uuid) -> StoreResult<Option<pipeline::Model>> {
        Ok(self.lock().pipelines.iter().find(|p| p.id == id).cloned())
    }

    async fn find_pipeline_by_name(&self, name: &str) -> StoreResult<Option<pipeline::Model>> {
        Ok(self
            .lock()
            .pipelines
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn create_pipeline(&self, name: &str) -> StoreResult<pipeline::Model> {
        let mut state = self.lock_for_write()?;
        let model = pipeline::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now(),
        };
        state.pipelines.push(model.clone());
        Ok(model)
    }

    async fn find_stage(&self, id: Uuid) -> StoreResult<Option<stage::Model>> {
        Ok(self.lock().stages.iter().find(|s| s.id == id).cloned())
    }

    async fn find_stage_by_name(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<stage::Model>> {
        let wanted = name.to_lowercase();
        Ok(self
            .lock()
            .stages
            .iter()
            .filter(|s| s.pipeline_id == pipeline_id && s.name.to_lowercase() == wanted)
            .min_by_key(|s| s.position)
            .cloned())
    }

    async fn list_stages(&self, pipeline_id: Uuid) -> StoreResult<Vec<stage::Model>> {
        let mut stages: Vec<_> = self
            .lock()
            .stages
            .iter()
            .filter(|s| s.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.position);
        Ok(stages)
    }

    async fn max_stage_position(&self, pipeline_id: Uuid) -> StoreResult<Option<i32>> {
        Ok(self
            .lock()
            .stages
            .iter()
            .filter(|s| s.pipeline_id == pipeline_id)
            .map(|s| s.position)
            .max())
    }

    async fn create_stage(
        &self,
        pipeline_id: Uuid,
        name: &str,
        position: i32,
    ) -> StoreResult<stage::Model> {
        let mut state = self.lock_for_write()?;
        let model = stage::Model {
            id: Uuid::new_v4(),
            pipeline_id,
            name: name.to_string(),
            position,
            created_at: now(),
        };
        state.stages.push(model.clone());
        Ok(model)
    }

    async fn find_loss_reason(&self, id: Uuid) -> StoreResult<Option<loss_reason::Model>> {
        Ok(self
            .lock()
            .loss_reasons
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_loss_reasons(&self, pipeline_id: Uuid) -> StoreResult<Vec<loss_reason::Model>> {
        let mut reasons: Vec<_> = self
            .lock()
            .loss_reasons
            .iter()
            .filter(|r| r.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        reasons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(reasons)
    }

    async fn create_loss_reason(
        &self,
        pipeline_id: Uuid,
        name: &str,
    ) -> StoreResult<loss_reason::Model> {
        let mut state = self.lock_for_write()?;
        let model = loss_reason::Model {
            id: Uuid::new_v4(),
            pipeline_id,
            name: name.to_string(),
            created_at: now(),
        };
        state.loss_reasons.push(model.clone());
        Ok(model)
    }

    async fn create_activity(&self, activity: NewActivity) -> StoreResult<deal_activity::Model> {
        let mut state = self.lock_for_write()?;
        let model = deal_activity::Model {
            id: Uuid::new_v4(),
            deal_id: activity.deal_id,
            kind: activity.kind,
            message: activity.message,
            created_at: now(),
            created_by: activity.created_by,
        };
        state.activities.push(model.clone());
        Ok(model)
    }

    async fn list_activities(&self, deal_id: Uuid) -> StoreResult<Vec<deal_activity::Model>> {
        Ok(self
            .lock()
            .activities
            .iter()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect())
    }
}
