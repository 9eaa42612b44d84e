pub mod config;
pub mod dispatcher_fee;
pub mod engine;
pub mod error;
pub mod match_engine;
pub mod reconcile;
pub mod registration;
pub mod settlement;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use dispatcher_fee::FeePosting;
pub use engine::FinanceEngine;
pub use error::{FinanceError, FinanceResult};
pub use match_engine::ReconciliationCandidate;
pub use reconcile::{ReconciliationOutcome, ReconciliationRequest};
pub use registration::LoadRegistration;
pub use settlement::WeekClosing;
pub use summary::{Dashboard, OpenLoadsSummary, PartyFilter, PayablesReceivables, Summary};
