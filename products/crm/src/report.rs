//! Pipeline reporting: deal counts and values per stage and per status.

use std::collections::HashMap;

use entity::deal::Status;
use entity::{pipeline, stage};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{DealError, DealResult, StoreError};
use crate::store::{DealStore, DealTotals};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotals {
    pub stage_id: Uuid,
    pub name: String,
    pub position: i32,
    /// Open deals currently sitting in the stage.
    pub open_deals: u64,
    pub open_value_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotals {
    pub status: Status,
    pub deals: u64,
    pub value_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub stages: Vec<StageTotals>,
    /// Always OPEN, WON, LOST in that order.
    pub statuses: Vec<StatusTotals>,
}

impl PipelineReport {
    pub fn status(&self, status: Status) -> Option<&StatusTotals> {
        self.statuses.iter().find(|totals| totals.status == status)
    }
}

fn add_cents(total: i64, value: i64) -> DealResult<i64> {
    total
        .checked_add(value)
        .ok_or(DealError::Failed(StoreError::Overflow("pipeline report total")))
}

fn aggregate(
    pipeline: &pipeline::Model,
    stages: &[stage::Model],
    totals: &[DealTotals],
) -> DealResult<PipelineReport> {
    let mut open_by_stage: HashMap<Uuid, (u64, i64)> = HashMap::new();
    let mut statuses: Vec<StatusTotals> = [Status::Open, Status::Won, Status::Lost]
        .into_iter()
        .map(|status| StatusTotals {
            status,
            deals: 0,
            value_cents: 0,
        })
        .collect();

    for group in totals {
        if group.status == Status::Open {
            let entry = open_by_stage.entry(group.stage_id).or_default();
            entry.0 += group.deals;
            entry.1 = add_cents(entry.1, group.value_cents)?;
        }
        if let Some(row) = statuses.iter_mut().find(|t| t.status == group.status) {
            row.deals += group.deals;
            row.value_cents = add_cents(row.value_cents, group.value_cents)?;
        }
    }

    let stages = stages
        .iter()
        .map(|stage| {
            let (open_deals, open_value_cents) =
                open_by_stage.get(&stage.id).copied().unwrap_or_default();
            StageTotals {
                stage_id: stage.id,
                name: stage.name.clone(),
                position: stage.position,
                open_deals,
                open_value_cents,
            }
        })
        .collect();

    Ok(PipelineReport {
        pipeline_id: pipeline.id,
        pipeline_name: pipeline.name.clone(),
        stages,
        statuses,
    })
}

/// Totals are computed by the store; a sum outside the `i64` range fails
/// with [`DealError::Failed`].
pub async fn pipeline_report<S>(store: &S, pipeline_id: Uuid) -> DealResult<PipelineReport>
where
    S: DealStore + ?Sized,
{
    let pipeline = store
        .find_pipeline(pipeline_id)
        .await?
        .ok_or_else(|| DealError::pipeline_not_found(pipeline_id))?;
    let stages = store.list_stages(pipeline_id).await?;
    let totals = store.deal_totals(pipeline_id).await?;
    aggregate(&pipeline, &stages, &totals)
}
