use entity::{deal, deal_activity};
use tracing::info;
use uuid::Uuid;

use crate::error::{DealError, DealResult};
use crate::labels::{StageName, resolve_stage};
use crate::pipeline::{ensure_pipeline, find_or_create_stage};
use crate::store::{DealStore, NewActivity, NewDeal};

#[derive(Clone, Debug, Default)]
pub struct CreateDealRequest {
    pub title: String,
    pub pipeline_name: String,
    /// Free-text stage; absent means "Novo".
    pub stage_label: Option<String>,
    pub value_cents: i64,
    pub owner_id: Option<Uuid>,
    pub source: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Open a new deal in the named pipeline, creating the pipeline on first use.
pub async fn create_deal<S>(store: &S, request: CreateDealRequest) -> DealResult<deal::Model>
where
    S: DealStore + ?Sized,
{
    let title = request.title.trim();
    if title.is_empty() {
        return Err(DealError::InvalidInput("deal title must not be empty".into()));
    }
    if request.value_cents < 0 {
        return Err(DealError::InvalidInput(
            "deal value must not be negative".into(),
        ));
    }

    let pipeline = ensure_pipeline(store, &request.pipeline_name).await?.pipeline;
    let stage_name = request
        .stage_label
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(resolve_stage)
        .unwrap_or(StageName::Novo);
    let (stage, _) = find_or_create_stage(store, pipeline.id, stage_name.as_str()).await?;

    let source = request
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let deal = store
        .insert_deal(NewDeal {
            title: title.to_string(),
            pipeline_id: pipeline.id,
            stage_id: stage.id,
            value_cents: request.value_cents,
            owner_id: request.owner_id,
            source,
        })
        .await?;
    store
        .create_activity(NewActivity {
            deal_id: deal.id,
            kind: deal_activity::Kind::Created,
            message: format!("Negocio criado no funil {}.", pipeline.name),
            created_by: request.created_by,
        })
        .await?;

    info!(deal_id = %deal.id, pipeline = %pipeline.name, stage = %stage.name, "deal created");
    Ok(deal)
}

pub async fn find_deal<S>(store: &S, deal_id: Uuid) -> DealResult<deal::Model>
where
    S: DealStore + ?Sized,
{
    store
        .find_deal(deal_id)
        .await?
        .ok_or_else(|| DealError::deal_not_found(deal_id))
}

pub async fn deal_activities<S>(store: &S, deal_id: Uuid) -> DealResult<Vec<deal_activity::Model>>
where
    S: DealStore + ?Sized,
{
    find_deal(store, deal_id).await?;
    Ok(store.list_activities(deal_id).await?)
}
