//! Content selection.
//!
//! Selection has two regimes:
//!
//! - **Cold start**: fixed base weights adjusted by context overrides, used
//!   until enough outcomes exist.
//! - **Effectiveness weighted**: each base weight is multiplied by a clamped
//!   factor derived from the category's went-back rate relative to the pooled
//!   rate. The clamp keeps every category drawable so it keeps producing
//!   signal.
//!
//! Both regimes then apply the same overrides and triggers, draw a category,
//! and pick an instance that was not shown recently. The selector holds no
//! mutable state; recent history and the random source are passed in.

mod config;
mod weights;

pub use config::{BaseWeights, OverrideConfig, SelectorConfig, TriggerConfig};
pub use weights::{CategoryWeights, WEIGHT_SCALE};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::{ContentCatalog, ContentCategory, ContentInstance};
use crate::context::InterventionContext;
use crate::effectiveness::{EffectivenessReport, InterventionKind};
use crate::error::{ConfigError, Result};

/// Which weighting regime produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    ColdStart,
    EffectivenessWeighted,
}

/// Stateless content selector.
#[derive(Debug, Clone, Default)]
pub struct ContentSelector {
    config: SelectorConfig,
}

impl ContentSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Regime for the given report. No report means cold start.
    pub fn mode(&self, report: Option<&EffectivenessReport>) -> SelectionMode {
        match report {
            Some(r) if r.lifetime_outcomes >= self.config.min_outcomes_for_weighting => {
                SelectionMode::EffectivenessWeighted
            }
            _ => SelectionMode::ColdStart,
        }
    }

    /// Resolve the weights that the next draw would use.
    ///
    /// Only categories with at least one catalog instance are kept. A base
    /// category without instances is a configuration error.
    pub fn weights_for(
        &self,
        context: &InterventionContext,
        kind: InterventionKind,
        catalog: &ContentCatalog,
        report: Option<&EffectivenessReport>,
    ) -> Result<(CategoryWeights, SelectionMode)> {
        for category in ContentCategory::BASE {
            if !catalog.has_category(category) {
                return Err(ConfigError::MissingCategory(category).into());
            }
        }

        let mode = self.mode(report);
        let mut weights = CategoryWeights::new();
        for (category, weight) in self.config.base_weights.entries() {
            weights.set(category, weight);
        }

        if let (SelectionMode::EffectivenessWeighted, Some(report)) = (mode, report) {
            for category in ContentCategory::BASE {
                weights.scale(category, self.multiplier(category, report));
            }
        }

        self.apply_overrides(&mut weights, context);
        self.apply_triggers(&mut weights, context, kind);
        weights.retain(|c| catalog.has_category(c));

        Ok((weights, mode))
    }

    /// Weight multiplier for a category in effectiveness-weighted mode.
    ///
    /// `1 + sensitivity * (rate - pooled) / pooled`, clamped. Categories
    /// without enough samples, or a pooled rate of zero, stay at 1.0.
    pub fn multiplier(&self, category: ContentCategory, report: &EffectivenessReport) -> f64 {
        let pooled = report.pooled_went_back_rate;
        let Some(agg) = report.get(category) else {
            return 1.0;
        };
        if agg.total_shown < self.config.min_category_samples || pooled <= 0.0 {
            return 1.0;
        }
        let bonus = self.config.sensitivity * (agg.went_back_rate - pooled) / pooled;
        (1.0 + bonus).clamp(self.config.min_multiplier, self.config.max_multiplier)
    }

    fn apply_overrides(&self, weights: &mut CategoryWeights, context: &InterventionContext) {
        let o = &self.config.overrides;
        if context.is_late_night {
            weights.raise_to_share(ContentCategory::Breathing, o.late_night_breathing_share);
        }
        if context.quick_reopen_attempt {
            weights.raise_to_share(ContentCategory::Reflection, o.quick_reopen_reflection_share);
        }
        if context.current_session_minutes() > o.long_session_minutes {
            weights.raise_to_share(
                ContentCategory::TimeAlternative,
                o.long_session_time_alternative_share,
            );
        }
    }

    fn apply_triggers(
        &self,
        weights: &mut CategoryWeights,
        context: &InterventionContext,
        kind: InterventionKind,
    ) {
        let t = &self.config.triggers;
        if context.goal_reached() {
            weights.add(ContentCategory::EmotionalAppeal, t.emotional_appeal_weight);
        }
        if context.streak_days >= t.gamification_min_streak {
            weights.add(ContentCategory::Gamification, t.gamification_weight);
        }
        if kind == InterventionKind::ExtendedSession && !context.is_late_night {
            weights.add(
                ContentCategory::ActivitySuggestion,
                t.activity_suggestion_weight,
            );
        }
        if context.sessions_today >= t.quote_min_sessions {
            weights.add(ContentCategory::Quote, t.quote_weight);
        }
    }

    /// Select one instance.
    ///
    /// `recent_ids` are the ids of the latest presentations, newest first.
    pub fn select<R: Rng + ?Sized>(
        &self,
        context: &InterventionContext,
        kind: InterventionKind,
        catalog: &ContentCatalog,
        report: Option<&EffectivenessReport>,
        recent_ids: &[String],
        rng: &mut R,
    ) -> Result<ContentInstance> {
        let (weights, mode) = self.weights_for(context, kind, catalog, report)?;
        let category = weights.draw(rng).ok_or_else(|| ConfigError::InvalidValue {
            key: "selector.base_weights".into(),
            message: "all category weights are zero".into(),
        })?;

        let instance = self.pick_instance(catalog, category, recent_ids, rng)?;
        tracing::debug!(
            "Selected {} from {} ({:?}, {:.1}% share)",
            instance.id,
            category,
            mode,
            weights.share(category)
        );
        Ok(instance)
    }

    /// Uniform pick within a category, avoiding the last `recent_window`
    /// presentations. Falls back to the full pool minus the immediately
    /// preceding id when everything is recent.
    fn pick_instance<R: Rng + ?Sized>(
        &self,
        catalog: &ContentCatalog,
        category: ContentCategory,
        recent_ids: &[String],
        rng: &mut R,
    ) -> Result<ContentInstance> {
        let pool = catalog.instances_of(category);
        if pool.is_empty() {
            return Err(ConfigError::MissingCategory(category).into());
        }

        let window = &recent_ids[..recent_ids.len().min(self.config.recent_window)];
        let previous = recent_ids.first();

        let mut candidates: Vec<&ContentInstance> = pool
            .iter()
            .copied()
            .filter(|i| !window.contains(&i.id) && Some(&i.id) != previous)
            .collect();
        if candidates.is_empty() {
            candidates = pool
                .iter()
                .copied()
                .filter(|i| Some(&i.id) != previous)
                .collect();
        }
        if candidates.is_empty() {
            candidates = pool;
        }

        let index = rng.gen_range(0..candidates.len());
        Ok(candidates[index].clone())
    }
}
