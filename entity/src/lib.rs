//! sea-orm models for the deal pipeline tables.

pub mod deal;
pub mod deal_activity;
pub mod loss_reason;
pub mod pipeline;
pub mod stage;
