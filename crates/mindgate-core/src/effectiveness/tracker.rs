//! Records outcomes and derives effectiveness reports from the log.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{self, EffectivenessReport};
use super::outcome::{InterventionOutcome, PatchStatus};
use super::store::OutcomeStore;
use crate::content::ContentCategory;
use crate::error::{CoreError, Result, StoreError};

/// Tunables for underperformance detection and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectivenessConfig {
    /// Categories below this went-back rate are flagged (default: 0.25)
    pub underperformance_floor: f64,
    /// Fewer observations than this are never flagged (default: 20)
    pub min_samples: u32,
    /// Recency window applied to selection weights, 0 for all history (default: 90)
    pub weighting_window_days: u32,
}

impl EffectivenessConfig {
    /// The weighting window as passed to [`EffectivenessTracker::aggregate`].
    pub fn weighting_window(&self) -> Option<u32> {
        (self.weighting_window_days > 0).then_some(self.weighting_window_days)
    }
}

impl Default for EffectivenessConfig {
    fn default() -> Self {
        Self {
            underperformance_floor: 0.25,
            min_samples: 20,
            weighting_window_days: 90,
        }
    }
}

/// Front door to the outcome log.
pub struct EffectivenessTracker {
    store: Arc<dyn OutcomeStore>,
    config: EffectivenessConfig,
}

impl EffectivenessTracker {
    pub fn new(store: Arc<dyn OutcomeStore>) -> Self {
        Self::with_config(store, EffectivenessConfig::default())
    }

    pub fn with_config(store: Arc<dyn OutcomeStore>, config: EffectivenessConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EffectivenessConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn OutcomeStore> {
        &self.store
    }

    /// Append an outcome.
    ///
    /// A failed write is returned to the caller.
    pub fn record(&self, outcome: &InterventionOutcome) -> Result<()> {
        match self.store.append_outcome(outcome) {
            Ok(()) => {
                tracing::info!(
                    "Recorded {} for {} ({}, {}ms)",
                    outcome.decision.as_str(),
                    outcome.instance_id,
                    outcome.category,
                    outcome.latency_ms
                );
                Ok(())
            }
            Err(StoreError::Duplicate(show_id)) => Err(CoreError::DuplicateDecision { show_id }),
            Err(e) => {
                tracing::error!("Failed to record outcome for show {}: {}", outcome.show_id, e);
                Err(CoreError::OutcomeWrite(e))
            }
        }
    }

    /// Attach the final session figures to the session's outcome.
    ///
    /// A missing or already-patched target is logged and ignored.
    pub fn patch_session_outcome(
        &self,
        session_id: &str,
        final_duration_ms: u64,
        ended_normally: bool,
    ) -> Result<PatchStatus> {
        let status = self
            .store
            .patch_session(session_id, final_duration_ms, ended_normally)?;
        match status {
            PatchStatus::Applied => {}
            PatchStatus::NotFound => {
                tracing::warn!("No outcome to patch for session {}", session_id);
            }
            PatchStatus::AlreadyPatched => {
                tracing::warn!("Outcome for session {} was already patched", session_id);
            }
        }
        Ok(status)
    }

    /// Recompute the report from the log, optionally over the last
    /// `window_days` days before `now`.
    pub fn aggregate_at(
        &self,
        window_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<EffectivenessReport> {
        let since = window_days.map(|days| now - Duration::days(days as i64));
        let outcomes = self.store.outcomes_since(since)?;
        let lifetime = self.store.outcome_count()?;
        Ok(aggregate::build_report(&outcomes, window_days, lifetime, now))
    }

    pub fn aggregate(&self, window_days: Option<u32>) -> Result<EffectivenessReport> {
        self.aggregate_at(window_days, Utc::now())
    }

    /// Underperforming categories in `report` under the configured floor and
    /// sample minimum.
    pub fn underperforming(&self, report: &EffectivenessReport) -> Vec<ContentCategory> {
        aggregate::underperforming(
            report,
            self.config.min_samples,
            self.config.underperformance_floor,
        )
    }

    pub fn recent_latencies(&self, limit: usize) -> Result<Vec<u64>> {
        Ok(self.store.recent_latencies(limit)?)
    }
}
