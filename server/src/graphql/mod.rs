mod types;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Object, Schema, SchemaBuilder};
use platform_api::internal_error;
use products_crm::{DealError, DealService};
use tracing::instrument;
use uuid::Uuid;

use crate::error::api_error;

pub use types::*;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Pipeline used when `createDeal` names none.
#[derive(Clone, Debug)]
pub struct DefaultPipeline(pub String);

pub fn schema_builder() -> SchemaBuilder<QueryRoot, MutationRoot, EmptySubscription> {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
}

pub fn build_schema(service: DealService, default_pipeline: String) -> SchemaType {
    schema_builder()
        .data(service)
        .data(DefaultPipeline(default_pipeline))
        .finish()
}

fn service<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a DealService> {
    ctx.data::<DealService>()
        .map_err(|_| internal_error(anyhow::anyhow!("deal service missing from schema data")))
}

fn gql_error(err: DealError) -> async_graphql::Error {
    api_error(err).extend()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Looks a pipeline up by exact name without creating it.
    #[instrument(name = "graphql.pipeline", skip(self, ctx))]
    async fn pipeline(
        &self,
        ctx: &Context<'_>,
        name: String,
    ) -> async_graphql::Result<Option<PipelineNode>> {
        let service = service(ctx)?;
        let Some(found) = service.pipeline(&name).await.map_err(gql_error)? else {
            return Ok(None);
        };
        let reasons = service
            .loss_reasons(found.pipeline.id)
            .await
            .map_err(gql_error)?;
        Ok(Some(PipelineNode::new(found, reasons)))
    }

    #[instrument(name = "graphql.deal", skip(self, ctx))]
    async fn deal(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<Option<DealNode>> {
        match service(ctx)?.deal(id).await {
            Ok(deal) => Ok(Some(deal.into())),
            Err(DealError::NotFound { .. }) => Ok(None),
            Err(err) => Err(gql_error(err)),
        }
    }

    #[instrument(name = "graphql.deal_activities", skip(self, ctx))]
    async fn deal_activities(
        &self,
        ctx: &Context<'_>,
        deal_id: Uuid,
    ) -> async_graphql::Result<Vec<ActivityNode>> {
        let activities = service(ctx)?.activities(deal_id).await.map_err(gql_error)?;
        Ok(activities.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "graphql.pipeline_report", skip(self, ctx))]
    async fn pipeline_report(
        &self,
        ctx: &Context<'_>,
        pipeline_id: Uuid,
    ) -> async_graphql::Result<PipelineReportNode> {
        let report = service(ctx)?.report(pipeline_id).await.map_err(gql_error)?;
        Ok(report.into())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Moves a deal to another stage and/or status from free-text labels.
    #[instrument(name = "graphql.transition_deal", skip(self, ctx, input))]
    async fn transition_deal(
        &self,
        ctx: &Context<'_>,
        deal_id: Uuid,
        input: TransitionInput,
    ) -> async_graphql::Result<TransitionPayload> {
        let outcome = service(ctx)?
            .transition(input.into_request(deal_id))
            .await
            .map_err(gql_error)?;
        Ok(outcome.into())
    }

    #[instrument(name = "graphql.create_deal", skip_all)]
    async fn create_deal(
        &self,
        ctx: &Context<'_>,
        input: NewDealInput,
    ) -> async_graphql::Result<DealNode> {
        let default_pipeline = ctx.data::<DefaultPipeline>().map_err(|_| {
            internal_error(anyhow::anyhow!("default pipeline missing from schema data"))
        })?;
        let deal = service(ctx)?
            .create_deal(input.into_request(&default_pipeline.0))
            .await
            .map_err(gql_error)?;
        Ok(deal.into())
    }

    #[instrument(name = "graphql.add_loss_reason", skip(self, ctx))]
    async fn add_loss_reason(
        &self,
        ctx: &Context<'_>,
        pipeline_id: Uuid,
        name: String,
    ) -> async_graphql::Result<LossReasonNode> {
        let reason = service(ctx)?
            .add_loss_reason(pipeline_id, &name)
            .await
            .map_err(gql_error)?;
        Ok(reason.into())
    }
}
