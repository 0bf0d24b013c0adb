//! Outcome recording and effectiveness aggregation.

mod aggregate;
mod outcome;
pub(crate) mod store;
mod tracker;

pub use aggregate::{
    build_report, underperforming, EffectivenessAggregate, EffectivenessReport, InstanceAggregate,
};
pub use outcome::{InterventionKind, InterventionOutcome, PatchStatus, ShowRecord, UserDecision};
pub use store::{MemoryOutcomeStore, OutcomeStore};
pub use tracker::{EffectivenessConfig, EffectivenessTracker};
