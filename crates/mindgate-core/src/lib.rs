//! # Mindgate Core Library
//!
//! Decision engine for a mindful-usage intervention layer. When a user opens
//! a tracked app (or stays in one too long), the engine picks what to show
//! them, how much friction to put in front of the proceed control, and
//! learns from what they do next.
//!
//! ## Architecture
//!
//! - **Context**: a flat snapshot of usage history and time, built through
//!   the [`UsageHistoryProvider`] seam
//! - **Friction**: a pure, ordered rule set mapping tenure and behavior to a
//!   [`FrictionTier`]
//! - **Selector**: weighted category draw with context overrides, then a
//!   uniform pick that avoids recent repeats
//! - **Effectiveness**: an append-only show/outcome log and the per-category
//!   reports projected from it
//! - **Storage**: SQLite outcome log and TOML configuration
//!
//! ## Key Components
//!
//! - [`InterventionEngine`]: the facade callers drive
//! - [`ContentCatalog`]: versioned, validated content instances
//! - [`Database`]: persistent [`OutcomeStore`]
//! - [`EngineConfig`]: every tuning constant

pub mod content;
pub mod context;
pub mod effectiveness;
pub mod engine;
pub mod error;
pub mod friction;
pub mod selector;
pub mod storage;

pub use content::{ContentCatalog, ContentCategory, ContentInstance, ContentPayload, UsageMetric};
pub use context::{ContextBuilder, InterventionContext, StaticUsageHistory, UsageHistoryProvider};
pub use effectiveness::{
    EffectivenessReport, EffectivenessTracker, InterventionKind, InterventionOutcome,
    MemoryOutcomeStore, OutcomeStore, PatchStatus, ShowRecord, UserDecision,
};
pub use engine::{Decision, InterventionEngine};
pub use error::{ConfigError, CoreError, StoreError, UsageError, ValidationError};
pub use friction::{FrictionClassifier, FrictionTier};
pub use selector::{ContentSelector, SelectionMode};
pub use storage::{Database, EngineConfig};
