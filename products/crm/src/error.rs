use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a [`DealStore`](crate::store::DealStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: Uuid },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("{0} exceeded the 64-bit range")]
    Overflow(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum DealError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("nothing to update: provide a stage or a status")]
    NoOp,
    #[error("{0}")]
    InvalidInput(String),
    /// Any storage failure. Nothing is retried and partial writes are not
    /// compensated here; the service rolls back its transaction.
    #[error("deal operation failed")]
    Failed(#[from] StoreError),
}

impl DealError {
    pub(crate) fn deal_not_found(id: Uuid) -> Self {
        DealError::NotFound { entity: "deal", id }
    }

    pub(crate) fn pipeline_not_found(id: Uuid) -> Self {
        DealError::NotFound {
            entity: "pipeline",
            id,
        }
    }
}

impl From<DbErr> for DealError {
    fn from(value: DbErr) -> Self {
        DealError::Failed(StoreError::Db(value))
    }
}

pub type DealResult<T> = Result<T, DealError>;
