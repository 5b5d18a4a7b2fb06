//! Deal stage/status transitions.
//!
//! There is no transition table: any stage is reachable from any status. The
//! only coupling is that winning a deal without naming a stage moves it to
//! "Fechado"; losing it leaves the stage alone.

use entity::deal::Status;
use entity::{deal, deal_activity, stage};
use tracing::info;
use uuid::Uuid;

use crate::error::{DealError, DealResult};
use crate::labels::{StageName, resolve_stage, resolve_status};
use crate::pipeline::find_or_create_stage;
use crate::store::{DealPatch, DealStore, NewActivity};

const UNKNOWN_STAGE: &str = "etapa desconhecida";

/// A requested change to one deal. Labels are free text; see
/// [`labels`](crate::labels) for how they resolve.
#[derive(Clone, Debug, Default)]
pub struct TransitionRequest {
    pub deal_id: Uuid,
    pub stage_label: Option<String>,
    pub status_label: Option<String>,
    pub loss_reason_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
}

impl TransitionRequest {
    pub fn new(deal_id: Uuid) -> Self {
        Self {
            deal_id,
            ..Self::default()
        }
    }

    pub fn stage(mut self, label: impl Into<String>) -> Self {
        self.stage_label = Some(label.into());
        self
    }

    pub fn status(mut self, label: impl Into<String>) -> Self {
        self.status_label = Some(label.into());
        self
    }

    pub fn loss_reason(mut self, id: Uuid) -> Self {
        self.loss_reason_id = Some(id);
        self
    }

    pub fn actor(mut self, id: Uuid) -> Self {
        self.actor_id = Some(id);
        self
    }
}

#[derive(Clone, Debug)]
pub struct TransitionOutcome {
    pub deal: deal::Model,
    /// Stage the deal was moved to, when one was resolved.
    pub stage: Option<stage::Model>,
    pub stage_created: bool,
    pub activities: Vec<deal_activity::Model>,
}

fn supplied(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|value| !value.is_empty())
}

fn stage_change_message(previous: &str, next: &str, pipeline: &str) -> String {
    format!("Etapa atualizada de {previous} para {next} no funil {pipeline}.")
}

fn lost_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Negocio marcado como perdido Motivo: {reason}."),
        None => "Negocio marcado como perdido".to_string(),
    }
}

/// Resolve the requested labels and persist the resulting deal change plus
/// its activity entries.
///
/// Without either label this fails with [`DealError::NoOp`] before touching
/// storage. Activities are appended only for values that actually changed.
pub async fn apply_transition<S>(
    store: &S,
    request: &TransitionRequest,
) -> DealResult<TransitionOutcome>
where
    S: DealStore + ?Sized,
{
    let stage_label = supplied(request.stage_label.as_deref());
    let status_label = supplied(request.status_label.as_deref());
    if stage_label.is_none() && status_label.is_none() {
        return Err(DealError::NoOp);
    }

    let current = store
        .find_deal(request.deal_id)
        .await?
        .ok_or_else(|| DealError::deal_not_found(request.deal_id))?;

    let target_status = status_label.map(resolve_status);
    let target_stage = match stage_label {
        Some(label) => Some(resolve_stage(label)),
        None if target_status == Some(Status::Won) => Some(StageName::Fechado),
        None => None,
    };

    let mut patch = DealPatch::default();
    let mut next_stage = None;
    let mut stage_created = false;
    if let Some(name) = target_stage {
        let (stage, created) = find_or_create_stage(store, current.pipeline_id, name.as_str()).await?;
        patch.stage_id = Some(stage.id);
        stage_created = created;
        next_stage = Some(stage);
    }

    let loss_reason_id = match target_status {
        Some(Status::Lost) => request.loss_reason_id,
        _ => None,
    };
    if let Some(status) = target_status {
        patch.status = Some(status);
        patch.loss_reason_id = Some(loss_reason_id);
    }

    let updated = store.update_deal(current.id, patch).await?;

    let mut activities = Vec::new();
    if let Some(stage) = next_stage.as_ref().filter(|s| s.id != current.stage_id) {
        let previous = store
            .find_stage(current.stage_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| UNKNOWN_STAGE.to_string());
        let pipeline = store
            .find_pipeline(current.pipeline_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_default();
        let entry = store
            .create_activity(NewActivity {
                deal_id: current.id,
                kind: deal_activity::Kind::StageChange,
                message: stage_change_message(&previous, &stage.name, &pipeline),
                created_by: request.actor_id,
            })
            .await?;
        activities.push(entry);
    }

    if let Some(status) = target_status {
        let changed = status != current.status
            || (status == Status::Lost && loss_reason_id != current.loss_reason_id);
        if changed {
            let message = if status == Status::Lost {
                let reason = match loss_reason_id {
                    Some(id) => store.find_loss_reason(id).await?.map(|r| r.name),
                    None => None,
                };
                lost_message(reason.as_deref())
            } else {
                let raw = request.status_label.as_deref().unwrap_or_default();
                format!("Status atualizado para {raw}.")
            };
            let entry = store
                .create_activity(NewActivity {
                    deal_id: current.id,
                    kind: deal_activity::Kind::StatusChange,
                    message,
                    created_by: request.actor_id,
                })
                .await?;
            activities.push(entry);
        }
    }

    info!(
        deal_id = %updated.id,
        stage = next_stage.as_ref().map(|s| s.name.as_str()),
        status = target_status.map(Status::as_str),
        stage_created,
        activities = activities.len(),
        "deal transition applied"
    );

    Ok(TransitionOutcome {
        deal: updated,
        stage: next_stage,
        stage_created,
        activities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDealStore;
    use crate::pipeline::ensure_pipeline;
    use crate::store::NewDeal;
    use entity::deal_activity::Kind;

    struct Fixture {
        store: MemoryDealStore,
        pipeline_id: Uuid,
        deal: deal::Model,
    }

    /// Pipeline "Vendas" holding only "Novo" (position 1) and "Contato"
    /// (position 2), with one open deal in "Novo".
    async fn fixture() -> Fixture {
        let store = MemoryDealStore::new();
        let pipeline = store.create_pipeline("Vendas").await.unwrap();
        let novo = store.create_stage(pipeline.id, "Novo", 1).await.unwrap();
        store.create_stage(pipeline.id, "Contato", 2).await.unwrap();
        let deal = store
            .insert_deal(NewDeal {
                title: "Licenças anuais".into(),
                pipeline_id: pipeline.id,
                stage_id: novo.id,
                value_cents: 150_000,
                owner_id: None,
                source: Some("site".into()),
            })
            .await
            .unwrap();
        Fixture {
            store,
            pipeline_id: pipeline.id,
            deal,
        }
    }

    async fn stage_named(store: &MemoryDealStore, pipeline_id: Uuid, name: &str) -> stage::Model {
        store
            .find_stage_by_name(pipeline_id, name)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn won_without_stage_moves_to_fechado() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id).status("Ganho");
        let outcome = apply_transition(&fx.store, &request).await.unwrap();

        let fechado = stage_named(&fx.store, fx.pipeline_id, "Fechado").await;
        assert!(outcome.stage_created);
        assert_eq!(fechado.position, 3);
        assert_eq!(outcome.deal.status, Status::Won);
        assert_eq!(outcome.deal.stage_id, fechado.id);

        let messages: Vec<_> = outcome
            .activities
            .iter()
            .map(|a| (a.kind, a.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            [
                (
                    Kind::StageChange,
                    "Etapa atualizada de Novo para Fechado no funil Vendas."
                ),
                (Kind::StatusChange, "Status atualizado para Ganho."),
            ]
        );
    }

    #[tokio::test]
    async fn lost_keeps_stage_and_records_reason() {
        let fx = fixture().await;
        let reason = fx
            .store
            .create_loss_reason(fx.pipeline_id, "Preco")
            .await
            .unwrap();
        let request = TransitionRequest::new(fx.deal.id)
            .status("Perdido")
            .loss_reason(reason.id);
        let outcome = apply_transition(&fx.store, &request).await.unwrap();

        assert_eq!(outcome.deal.status, Status::Lost);
        assert_eq!(outcome.deal.loss_reason_id, Some(reason.id));
        assert_eq!(outcome.deal.stage_id, fx.deal.stage_id);
        assert!(outcome.stage.is_none());
        assert_eq!(outcome.activities.len(), 1);
        assert_eq!(
            outcome.activities[0].message,
            "Negocio marcado como perdido Motivo: Preco."
        );
    }

    #[tokio::test]
    async fn lost_without_reason_clears_reference() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id).status("lost");
        let outcome = apply_transition(&fx.store, &request).await.unwrap();
        assert_eq!(outcome.deal.loss_reason_id, None);
        assert_eq!(outcome.activities[0].message, "Negocio marcado como perdido");
    }

    #[tokio::test]
    async fn open_and_won_clear_loss_reason() {
        for label in ["Reaberto", "Ganho"] {
            let fx = fixture().await;
            let reason = fx
                .store
                .create_loss_reason(fx.pipeline_id, "Prazo")
                .await
                .unwrap();
            let lost = TransitionRequest::new(fx.deal.id)
                .status("perdido")
                .loss_reason(reason.id);
            apply_transition(&fx.store, &lost).await.unwrap();

            let reopened = TransitionRequest::new(fx.deal.id).status(label);
            let outcome = apply_transition(&fx.store, &reopened).await.unwrap();
            assert_eq!(outcome.deal.loss_reason_id, None, "{label}");
            assert_ne!(outcome.deal.status, Status::Lost);
        }
    }

    #[tokio::test]
    async fn loss_reason_is_ignored_unless_lost() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id)
            .status("Em andamento")
            .loss_reason(Uuid::new_v4());
        let outcome = apply_transition(&fx.store, &request).await.unwrap();
        assert_eq!(outcome.deal.status, Status::Open);
        assert_eq!(outcome.deal.loss_reason_id, None);
        // already open: nothing changed, nothing logged
        assert!(outcome.activities.is_empty());
    }

    #[tokio::test]
    async fn missing_labels_are_rejected_without_writes() {
        let fx = fixture().await;
        let before = fx.store.write_count();
        let blank = TransitionRequest {
            stage_label: Some("  ".into()),
            ..TransitionRequest::new(fx.deal.id)
        };
        for request in [TransitionRequest::new(fx.deal.id), blank] {
            let err = apply_transition(&fx.store, &request).await.unwrap_err();
            assert!(matches!(err, DealError::NoOp));
        }
        assert_eq!(fx.store.write_count(), before);
    }

    #[tokio::test]
    async fn unknown_deal_is_not_found() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();
        let request = TransitionRequest::new(missing).stage("Proposta");
        let err = apply_transition(&fx.store, &request).await.unwrap_err();
        assert!(matches!(err, DealError::NotFound { entity: "deal", id } if id == missing));
    }

    #[tokio::test]
    async fn stage_label_is_normalized_and_logged() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id)
            .stage("Em negociação avançada")
            .actor(Uuid::nil());
        let outcome = apply_transition(&fx.store, &request).await.unwrap();

        let stage = outcome.stage.unwrap();
        assert_eq!(stage.name, "Negociacao");
        assert_eq!(outcome.deal.status, Status::Open);
        assert_eq!(outcome.activities.len(), 1);
        assert_eq!(
            outcome.activities[0].message,
            "Etapa atualizada de Novo para Negociacao no funil Vendas."
        );
        assert_eq!(outcome.activities[0].created_by, Some(Uuid::nil()));
    }

    #[tokio::test]
    async fn explicit_stage_wins_over_forced_fechado() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id)
            .stage("Em contato")
            .status("won");
        let outcome = apply_transition(&fx.store, &request).await.unwrap();
        assert_eq!(outcome.stage.unwrap().name, "Contato");
        assert_eq!(outcome.deal.status, Status::Won);
        assert!(
            fx.store
                .find_stage_by_name(fx.pipeline_id, "Fechado")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn repeating_a_stage_does_not_duplicate_it() {
        let fx = fixture().await;
        let request = TransitionRequest::new(fx.deal.id).stage("Proposta enviada");
        let first = apply_transition(&fx.store, &request).await.unwrap();
        let second = apply_transition(&fx.store, &request).await.unwrap();

        assert!(first.stage_created);
        assert!(!second.stage_created);
        assert_eq!(first.deal.stage_id, second.deal.stage_id);
        assert!(second.activities.is_empty());

        let proposals = fx
            .store
            .list_stages(fx.pipeline_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.name == "Proposta")
            .count();
        assert_eq!(proposals, 1);
    }

    #[tokio::test]
    async fn status_message_keeps_the_raw_label() {
        let fx = fixture().await;
        let won = TransitionRequest::new(fx.deal.id).status("GANHOU!!");
        let outcome = apply_transition(&fx.store, &won).await.unwrap();
        let status_entry = outcome
            .activities
            .iter()
            .find(|a| a.kind == Kind::StatusChange)
            .unwrap();
        assert_eq!(status_entry.message, "Status atualizado para GANHOU!!.");
    }

    #[tokio::test]
    async fn storage_failures_surface_as_failed() {
        let fx = fixture().await;
        fx.store.reject_writes(true);
        let request = TransitionRequest::new(fx.deal.id).stage("Contato");
        let err = apply_transition(&fx.store, &request).await.unwrap_err();
        assert!(matches!(err, DealError::Failed(_)));
    }

    #[tokio::test]
    async fn default_pipeline_already_has_fechado() {
        let store = MemoryDealStore::new();
        let seeded = ensure_pipeline(&store, "Vendas").await.unwrap();
        let deal = store
            .insert_deal(NewDeal {
                title: "Renovação".into(),
                pipeline_id: seeded.pipeline.id,
                stage_id: seeded.stages[0].id,
                value_cents: 0,
                owner_id: None,
                source: None,
            })
            .await
            .unwrap();
        let outcome = apply_transition(&store, &TransitionRequest::new(deal.id).status("Ganho"))
            .await
            .unwrap();
        assert!(!outcome.stage_created);
        assert_eq!(outcome.deal.stage_id, seeded.stages[4].id);
        assert_eq!(store.list_stages(seeded.pipeline.id).await.unwrap().len(), 5);
    }
}
