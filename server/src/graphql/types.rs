use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, FixedOffset};
use entity::{deal, deal_activity, loss_reason, stage};
use products_crm::{
    CreateDealRequest, PipelineReport, PipelineWithStages, StageTotals, StatusTotals,
    TransitionOutcome, TransitionRequest,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Enum, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealStatus {
    Open,
    Won,
    Lost,
}

impl From<deal::Status> for DealStatus {
    fn from(value: deal::Status) -> Self {
        match value {
            deal::Status::Open => DealStatus::Open,
            deal::Status::Won => DealStatus::Won,
            deal::Status::Lost => DealStatus::Lost,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Enum, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Created,
    StageChange,
    StatusChange,
}

impl From<deal_activity::Kind> for ActivityKind {
    fn from(value: deal_activity::Kind) -> Self {
        match value {
            deal_activity::Kind::Created => ActivityKind::Created,
            deal_activity::Kind::StageChange => ActivityKind::StageChange,
            deal_activity::Kind::StatusChange => ActivityKind::StatusChange,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealNode {
    pub id: Uuid,
    pub title: String,
    pub pipeline_id: Uuid,
    pub stage_id: Uuid,
    pub status: DealStatus,
    pub loss_reason_id: Option<Uuid>,
    pub value_cents: i64,
    pub owner_id: Option<Uuid>,
    pub source: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<deal::Model> for DealNode {
    fn from(model: deal::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            pipeline_id: model.pipeline_id,
            stage_id: model.stage_id,
            status: model.status.into(),
            loss_reason_id: model.loss_reason_id,
            value_cents: model.value_cents,
            owner_id: model.owner_id,
            source: model.source,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityNode {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub created_at: DateTime<FixedOffset>,
    pub created_by: Option<Uuid>,
}

impl From<deal_activity::Model> for ActivityNode {
    fn from(model: deal_activity::Model) -> Self {
        Self {
            id: model.id,
            deal_id: model.deal_id,
            kind: model.kind.into(),
            message: model.message,
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct StageNode {
    pub id: Uuid,
    pub name: String,
    pub position: i32,
}

impl From<stage::Model> for StageNode {
    fn from(model: stage::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            position: model.position,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct LossReasonNode {
    pub id: Uuid,
    pub name: String,
}

impl From<loss_reason::Model> for LossReasonNode {
    fn from(model: loss_reason::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNode {
    pub id: Uuid,
    pub name: String,
    pub stages: Vec<StageNode>,
    pub loss_reasons: Vec<LossReasonNode>,
}

impl PipelineNode {
    pub fn new(found: PipelineWithStages, reasons: Vec<loss_reason::Model>) -> Self {
        Self {
            id: found.pipeline.id,
            name: found.pipeline.name,
            stages: found.stages.into_iter().map(Into::into).collect(),
            loss_reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of `transitionDeal`. The activities are only the ones this call
/// appended.
#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub deal: DealNode,
    pub stage: Option<StageNode>,
    pub stage_created: bool,
    pub activities: Vec<ActivityNode>,
}

impl From<TransitionOutcome> for TransitionPayload {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            deal: outcome.deal.into(),
            stage: outcome.stage.map(Into::into),
            stage_created: outcome.stage_created,
            activities: outcome.activities.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTotalsNode {
    pub stage_id: Uuid,
    pub name: String,
    pub position: i32,
    pub open_deals: u64,
    pub open_value_cents: i64,
}

impl From<StageTotals> for StageTotalsNode {
    fn from(row: StageTotals) -> Self {
        Self {
            stage_id: row.stage_id,
            name: row.name,
            position: row.position,
            open_deals: row.open_deals,
            open_value_cents: row.open_value_cents,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTotalsNode {
    pub status: DealStatus,
    pub deals: u64,
    pub value_cents: i64,
}

impl From<StatusTotals> for StatusTotalsNode {
    fn from(row: StatusTotals) -> Self {
        Self {
            status: row.status.into(),
            deals: row.deals,
            value_cents: row.value_cents,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReportNode {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub stages: Vec<StageTotalsNode>,
    pub statuses: Vec<StatusTotalsNode>,
}

impl From<PipelineReport> for PipelineReportNode {
    fn from(report: PipelineReport) -> Self {
        Self {
            pipeline_id: report.pipeline_id,
            pipeline_name: report.pipeline_name,
            stages: report.stages.into_iter().map(Into::into).collect(),
            statuses: report.statuses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Shared by the `transitionDeal` mutation and `PATCH /api/deals/{id}`.
#[derive(Clone, Debug, Default, InputObject, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionInput {
    pub stage: Option<String>,
    pub status: Option<String>,
    pub loss_reason_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
}

impl TransitionInput {
    pub fn into_request(self, deal_id: Uuid) -> TransitionRequest {
        TransitionRequest {
            deal_id,
            stage_label: self.stage,
            status_label: self.status,
            loss_reason_id: self.loss_reason_id,
            actor_id: self.actor_id,
        }
    }
}

#[derive(Clone, Debug, InputObject, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDealInput {
    pub title: String,
    /// Defaults to the configured pipeline.
    pub pipeline: Option<String>,
    pub stage: Option<String>,
    #[serde(default)]
    #[graphql(default)]
    pub value_cents: i64,
    pub owner_id: Option<Uuid>,
    pub source: Option<String>,
    pub created_by: Option<Uuid>,
}

impl NewDealInput {
    pub fn into_request(self, default_pipeline: &str) -> CreateDealRequest {
        CreateDealRequest {
            title: self.title,
            pipeline_name: self
                .pipeline
                .unwrap_or_else(|| default_pipeline.to_string()),
            stage_label: self.stage,
            value_cents: self.value_cents,
            owner_id: self.owner_id,
            source: self.source,
            created_by: self.created_by,
        }
    }
}
