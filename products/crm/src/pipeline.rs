//! Pipeline bootstrap, on-demand stages and loss reasons.

use entity::{loss_reason, pipeline, stage};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DealError, DealResult, StoreResult};
use crate::labels::StageName;
use crate::store::DealStore;

#[derive(Clone, Debug)]
pub struct PipelineWithStages {
    pub pipeline: pipeline::Model,
    pub stages: Vec<stage::Model>,
}

/// Look the stage up by name (case-insensitive) inside the pipeline and create
/// it after the current last position when missing.
///
/// Find-then-create is not atomic: two concurrent callers introducing the same
/// new name can both insert it.
pub async fn find_or_create_stage<S>(
    store: &S,
    pipeline_id: Uuid,
    name: &str,
) -> StoreResult<(stage::Model, bool)>
where
    S: DealStore + ?Sized,
{
    if let Some(existing) = store.find_stage_by_name(pipeline_id, name).await? {
        return Ok((existing, false));
    }
    let position = store.max_stage_position(pipeline_id).await?.unwrap_or(0) + 1;
    let created = store.create_stage(pipeline_id, name, position).await?;
    debug!(%pipeline_id, stage = %created.name, position, "stage created on demand");
    Ok((created, true))
}

fn required_name<'a>(raw: &'a str, what: &str) -> DealResult<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DealError::InvalidInput(format!("{what} name must not be empty")));
    }
    Ok(trimmed)
}

/// Return the pipeline called `name`, creating it with the default stages.
pub async fn ensure_pipeline<S>(store: &S, name: &str) -> DealResult<PipelineWithStages>
where
    S: DealStore + ?Sized,
{
    let name = required_name(name, "pipeline")?;
    if let Some(pipeline) = store.find_pipeline_by_name(name).await? {
        let stages = store.list_stages(pipeline.id).await?;
        return Ok(PipelineWithStages { pipeline, stages });
    }

    let pipeline = store.create_pipeline(name).await?;
    let mut stages = Vec::with_capacity(StageName::DEFAULTS.len());
    for stage in StageName::DEFAULTS {
        stages.push(
            store
                .create_stage(pipeline.id, stage.as_str(), stage.default_position())
                .await?,
        );
    }
    info!(pipeline = %pipeline.name, "pipeline created with default stages");
    Ok(PipelineWithStages { pipeline, stages })
}

pub async fn pipeline_by_name<S>(store: &S, name: &str) -> DealResult<Option<PipelineWithStages>>
where
    S: DealStore + ?Sized,
{
    let Some(pipeline) = store.find_pipeline_by_name(name.trim()).await? else {
        return Ok(None);
    };
    let stages = store.list_stages(pipeline.id).await?;
    Ok(Some(PipelineWithStages { pipeline, stages }))
}

pub async fn add_loss_reason<S>(
    store: &S,
    pipeline_id: Uuid,
    name: &str,
) -> DealResult<loss_reason::Model>
where
    S: DealStore + ?Sized,
{
    let name = required_name(name, "loss reason")?;
    store
        .find_pipeline(pipeline_id)
        .await?
        .ok_or_else(|| DealError::pipeline_not_found(pipeline_id))?;
    Ok(store.create_loss_reason(pipeline_id, name).await?)
}

pub async fn loss_reasons<S>(store: &S, pipeline_id: Uuid) -> DealResult<Vec<loss_reason::Model>>
where
    S: DealStore + ?Sized,
{
    store
        .find_pipeline(pipeline_id)
        .await?
        .ok_or_else(|| DealError::pipeline_not_found(pipeline_id))?;
    Ok(store.list_loss_reasons(pipeline_id).await?)
}
