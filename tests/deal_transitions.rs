use anyhow::{Context, Result};
use deals_tests::{seed_deal, seed_loss_reason, seed_pipeline, sqlite};
use entity::deal::Status;
use entity::deal_activity::Kind;
use entity::{deal, deal_activity, stage};
use products_crm::{CreateDealRequest, DealError, DealService, TransitionRequest};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

fn message_of(activities: &[deal_activity::Model], kind: Kind) -> Option<&str> {
    activities
        .iter()
        .find(|activity| activity.kind == kind)
        .map(|activity| activity.message.as_str())
}

#[tokio::test]
async fn winning_creates_missing_closing_stage() -> Result<()> {
    let db = sqlite().await?;
    let (pipeline, stages) = seed_pipeline(&db, "Vendas", &["Novo"]).await?;
    let deal = seed_deal(&db, &stages[0], "Implantacao ERP", 500_000).await?;
    let service = DealService::new(db);

    let outcome = service
        .transition(TransitionRequest::new(deal.id).status("Ganho"))
        .await?;
    assert!(outcome.stage_created);
    assert_eq!(outcome.deal.status, Status::Won);

    let stored_stages = stage::Entity::find()
        .filter(stage::Column::PipelineId.eq(pipeline.id))
        .order_by_asc(stage::Column::Position)
        .all(service.db())
        .await?;
    assert_eq!(stored_stages.len(), 2);
    let fechado = &stored_stages[1];
    assert_eq!(fechado.name, "Fechado");
    assert_eq!(fechado.position, 2);

    let stored = deal::Entity::find_by_id(deal.id)
        .one(service.db())
        .await?
        .context("deal vanished")?;
    assert_eq!(stored.stage_id, fechado.id);
    assert_eq!(stored.status, Status::Won);
    assert_eq!(stored.loss_reason_id, None);

    let activities = service.activities(deal.id).await?;
    assert_eq!(activities.len(), 2);
    assert_eq!(
        message_of(&activities, Kind::StageChange),
        Some("Etapa atualizada de Novo para Fechado no funil Vendas.")
    );
    assert_eq!(
        message_of(&activities, Kind::StatusChange),
        Some("Status atualizado para Ganho.")
    );
    Ok(())
}

#[tokio::test]
async fn losing_records_reason_and_keeps_stage() -> Result<()> {
    let db = sqlite().await?;
    let (pipeline, stages) = seed_pipeline(&db, "Vendas", &["Novo", "Contato"]).await?;
    let reason = seed_loss_reason(&db, pipeline.id, "Preco").await?;
    let deal = seed_deal(&db, &stages[1], "Suporte mensal", 12_000).await?;
    let service = DealService::new(db);

    let outcome = service
        .transition(
            TransitionRequest::new(deal.id)
                .status("Perdido")
                .loss_reason(reason.id),
        )
        .await?;
    assert_eq!(outcome.deal.status, Status::Lost);
    assert_eq!(outcome.deal.loss_reason_id, Some(reason.id));
    assert_eq!(outcome.deal.stage_id, stages[1].id);
    assert_eq!(outcome.activities.len(), 1);
    assert_eq!(
        outcome.activities[0].message,
        "Negocio marcado como perdido Motivo: Preco."
    );

    // Reopening clears the reason.
    let reopened = service
        .transition(TransitionRequest::new(deal.id).status("aberto"))
        .await?;
    assert_eq!(reopened.deal.status, Status::Open);
    assert_eq!(reopened.deal.loss_reason_id, None);
    Ok(())
}

#[tokio::test]
async fn existing_stage_is_matched_case_insensitively() -> Result<()> {
    let db = sqlite().await?;
    let (pipeline, stages) = seed_pipeline(&db, "Vendas", &["Novo", "PROPOSTA"]).await?;
    let deal = seed_deal(&db, &stages[0], "Treinamento", 8_000).await?;
    let service = DealService::new(db);

    let first = service
        .transition(TransitionRequest::new(deal.id).stage("Proposta enviada"))
        .await?;
    assert!(!first.stage_created);
    assert_eq!(first.deal.stage_id, stages[1].id);

    let again = service
        .transition(TransitionRequest::new(deal.id).stage("proposta revisada"))
        .await?;
    assert!(!again.stage_created);
    assert!(again.activities.is_empty());

    let count = stage::Entity::find()
        .filter(stage::Column::PipelineId.eq(pipeline.id))
        .count(service.db())
        .await?;
    assert_eq!(count, 2);
    Ok(())
}

#[tokio::test]
async fn rejected_transitions_leave_no_trace() -> Result<()> {
    let db = sqlite().await?;
    let (_, stages) = seed_pipeline(&db, "Vendas", &["Novo"]).await?;
    let deal = seed_deal(&db, &stages[0], "Licencas", 1_000).await?;
    let service = DealService::new(db);

    let noop = service
        .transition(TransitionRequest::new(deal.id).stage("   "))
        .await;
    assert!(matches!(noop, Err(DealError::NoOp)));

    let missing = service
        .transition(TransitionRequest::new(Uuid::new_v4()).stage("Contato"))
        .await;
    assert!(matches!(
        missing,
        Err(DealError::NotFound { entity: "deal", .. })
    ));

    assert!(service.activities(deal.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_write_rolls_back_created_stage() -> Result<()> {
    let db = sqlite().await?;
    let (pipeline, stages) = seed_pipeline(&db, "Vendas", &["Novo"]).await?;
    let deal = seed_deal(&db, &stages[0], "Consultoria fiscal", 30_000).await?;
    let service = DealService::new(db);

    // The stage is created first; the unknown reason then trips the foreign key.
    let failed = service
        .transition(
            TransitionRequest::new(deal.id)
                .stage("Proposta")
                .status("Perdido")
                .loss_reason(Uuid::new_v4()),
        )
        .await;
    assert!(matches!(failed, Err(DealError::Failed(_))));

    let count = stage::Entity::find()
        .filter(stage::Column::PipelineId.eq(pipeline.id))
        .count(service.db())
        .await?;
    assert_eq!(count, 1);

    let stored = deal::Entity::find_by_id(deal.id)
        .one(service.db())
        .await?
        .context("deal vanished")?;
    assert_eq!(stored.stage_id, stages[0].id);
    assert_eq!(stored.status, Status::Open);
    assert_eq!(stored.loss_reason_id, None);
    assert!(service.activities(deal.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn report_sum_overflow_is_an_error() -> Result<()> {
    let service = DealService::new(sqlite().await?);
    for title in ["Frota A", "Frota B"] {
        service
            .create_deal(CreateDealRequest {
                title: title.into(),
                pipeline_name: "Vendas".into(),
                value_cents: i64::MAX,
                ..CreateDealRequest::default()
            })
            .await?;
    }
    let pipeline = service.pipeline("Vendas").await?.context("missing pipeline")?;

    let report = service.report(pipeline.pipeline.id).await;
    assert!(matches!(report, Err(DealError::Failed(_))));
    Ok(())
}

#[tokio::test]
async fn service_bootstraps_pipeline_and_reports() -> Result<()> {
    let service = DealService::new(sqlite().await?);

    let first = service.ensure_pipeline("Vendas").await?;
    let second = service.ensure_pipeline("Vendas").await?;
    assert_eq!(first.pipeline.id, second.pipeline.id);
    let names: Vec<_> = second.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        ["Novo", "Contato", "Proposta", "Negociacao", "Fechado"]
    );

    let created = service
        .create_deal(CreateDealRequest {
            title: "Migracao de dados".into(),
            pipeline_name: "Vendas".into(),
            stage_label: Some("Em negociação avançada".into()),
            value_cents: 40_000,
            ..CreateDealRequest::default()
        })
        .await?;
    let other = service
        .create_deal(CreateDealRequest {
            title: "Auditoria".into(),
            pipeline_name: "Vendas".into(),
            value_cents: 10_000,
            ..CreateDealRequest::default()
        })
        .await?;
    service
        .transition(TransitionRequest::new(other.id).status("won"))
        .await?;

    let log = service.activities(created.id).await?;
    assert_eq!(
        message_of(&log, Kind::Created),
        Some("Negocio criado no funil Vendas.")
    );

    let report = service.report(first.pipeline.id).await?;
    let negociacao = report
        .stages
        .iter()
        .find(|row| row.name == "Negociacao")
        .context("missing stage row")?;
    assert_eq!(negociacao.open_deals, 1);
    assert_eq!(negociacao.open_value_cents, 40_000);
    let won = report.status(Status::Won).context("missing WON totals")?;
    assert_eq!(won.deals, 1);
    assert_eq!(won.value_cents, 10_000);
    Ok(())
}

#[tokio::test]
async fn loss_reasons_belong_to_a_pipeline() -> Result<()> {
    let service = DealService::new(sqlite().await?);
    let pipeline = service.ensure_pipeline("Vendas").await?;
    service
        .add_loss_reason(pipeline.pipeline.id, "Sem orcamento")
        .await?;
    service.add_loss_reason(pipeline.pipeline.id, "Concorrente").await?;

    let names: Vec<_> = service
        .loss_reasons(pipeline.pipeline.id)
        .await?
        .into_iter()
        .map(|reason| reason.name)
        .collect();
    assert_eq!(names, ["Concorrente", "Sem orcamento"]);

    let orphan = service.add_loss_reason(Uuid::new_v4(), "Prazo").await;
    assert!(matches!(orphan, Err(DealError::NotFound { .. })));
    Ok(())
}
