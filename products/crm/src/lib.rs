//! CRM deal pipeline.
//!
//! Deals move through the stages of a pipeline and carry an OPEN/WON/LOST
//! status. Callers describe changes with free-text labels; [`labels`] maps
//! them onto canonical stages and statuses, [`transition`] persists the result
//! and appends the activity log, and [`DealService`] wraps each operation in a
//! database transaction.

pub mod deals;
mod error;
pub mod labels;
pub mod memory;
mod orm;
pub mod pipeline;
pub mod report;
mod service;
pub mod store;
pub mod transition;

pub use deals::CreateDealRequest;
pub use error::{DealError, DealResult, StoreError, StoreResult};
pub use labels::{StageName, resolve_stage, resolve_status};
pub use orm::OrmDealStore;
pub use pipeline::PipelineWithStages;
pub use report::{PipelineReport, StageTotals, StatusTotals};
pub use service::DealService;
pub use store::{DealPatch, DealStore, DealTotals, NewActivity, NewDeal};
pub use transition::{TransitionOutcome, TransitionRequest, apply_transition};
