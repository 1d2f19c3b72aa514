//! Sync domain models, cadence and collaborator contracts.

mod baseline;
mod sync_model;
mod sync_scheduler;

pub use baseline::*;
pub use sync_model::*;
pub use sync_scheduler::*;
