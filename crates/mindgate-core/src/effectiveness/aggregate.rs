//! Per-category effectiveness statistics.
//!
//! Aggregates are a pure projection of the outcome log: they are recomputed
//! from raw records every time and never updated in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::{InterventionOutcome, UserDecision};
use crate::content::ContentCategory;

/// Statistics for one content category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessAggregate {
    pub category: ContentCategory,
    pub total_shown: u32,
    pub went_back: u32,
    /// went_back / total_shown (0.0-1.0)
    pub went_back_rate: f64,
    pub mean_latency_ms: f64,
    /// Mean final session length after a Proceeded decision. `None` until a
    /// proceeded outcome has been patched.
    pub mean_post_proceed_session_ms: Option<f64>,
}

/// Statistics for one content instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceAggregate {
    pub instance_id: String,
    pub category: ContentCategory,
    pub total_shown: u32,
    pub went_back: u32,
    pub went_back_rate: f64,
}

/// Everything the selector and the reporting surface need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessReport {
    /// Recency window in days, `None` for the full log.
    pub window_days: Option<u32>,
    pub generated_at: DateTime<Utc>,
    /// Outcomes inside the window.
    pub total_outcomes: usize,
    /// Outcomes in the whole log; drives the cold-start switch.
    pub lifetime_outcomes: usize,
    /// went-back rate over every outcome in the window.
    pub pooled_went_back_rate: f64,
    /// Categories with at least one outcome, in category order.
    pub categories: Vec<EffectivenessAggregate>,
    pub instances: Vec<InstanceAggregate>,
}

impl EffectivenessReport {
    pub fn get(&self, category: ContentCategory) -> Option<&EffectivenessAggregate> {
        self.categories.iter().find(|a| a.category == category)
    }

    /// A report over an empty log.
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        build_report(&[], None, 0, generated_at)
    }
}

#[derive(Default)]
struct Tally {
    shown: u32,
    went_back: u32,
    latency_sum: u128,
    post_proceed_sum: u128,
    post_proceed_count: u32,
}

impl Tally {
    fn add(&mut self, outcome: &InterventionOutcome) {
        self.shown += 1;
        self.latency_sum += u128::from(outcome.latency_ms);
        match outcome.decision {
            UserDecision::WentBack => self.went_back += 1,
            UserDecision::Proceeded => {
                if let Some(ms) = outcome.final_session_ms {
                    self.post_proceed_sum += u128::from(ms);
                    self.post_proceed_count += 1;
                }
            }
        }
    }

    fn rate(&self) -> f64 {
        if self.shown == 0 {
            0.0
        } else {
            self.went_back as f64 / self.shown as f64
        }
    }
}

/// Project `outcomes` into a report.
pub fn build_report(
    outcomes: &[InterventionOutcome],
    window_days: Option<u32>,
    lifetime_outcomes: usize,
    generated_at: DateTime<Utc>,
) -> EffectivenessReport {
    let mut by_category: BTreeMap<ContentCategory, Tally> = BTreeMap::new();
    let mut by_instance: BTreeMap<(ContentCategory, String), Tally> = BTreeMap::new();
    let mut pooled = Tally::default();

    for outcome in outcomes {
        by_category.entry(outcome.category).or_default().add(outcome);
        by_instance
            .entry((outcome.category, outcome.instance_id.clone()))
            .or_default()
            .add(outcome);
        pooled.add(outcome);
    }

    let categories = by_category
        .into_iter()
        .map(|(category, t)| EffectivenessAggregate {
            category,
            total_shown: t.shown,
            went_back: t.went_back,
            went_back_rate: t.rate(),
            mean_latency_ms: t.latency_sum as f64 / t.shown as f64,
            mean_post_proceed_session_ms: (t.post_proceed_count > 0)
                .then(|| t.post_proceed_sum as f64 / t.post_proceed_count as f64),
        })
        .collect();

    let instances = by_instance
        .into_iter()
        .map(|((category, instance_id), t)| InstanceAggregate {
            instance_id,
            category,
            total_shown: t.shown,
            went_back: t.went_back,
            went_back_rate: t.rate(),
        })
        .collect();

    EffectivenessReport {
        window_days,
        generated_at,
        total_outcomes: outcomes.len(),
        lifetime_outcomes: lifetime_outcomes.max(outcomes.len()),
        pooled_went_back_rate: pooled.rate(),
        categories,
        instances,
    }
}

/// Categories whose went-back rate is below `floor` with at least
/// `min_samples` observations. Low-sample categories are never flagged.
pub fn underperforming(
    report: &EffectivenessReport,
    min_samples: u32,
    floor: f64,
) -> Vec<ContentCategory> {
    report
        .categories
        .iter()
        .filter(|a| a.total_shown >= min_samples && a.went_back_rate < floor)
        .map(|a| a.category)
        .collect()
}
