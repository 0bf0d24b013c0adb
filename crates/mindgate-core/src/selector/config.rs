use serde::{Deserialize, Serialize};

use crate::content::ContentCategory;

/// Base weight table. Only the base categories appear here; the others are
/// reachable through triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseWeights {
    pub reflection: u32,
    pub time_alternative: u32,
    pub breathing: u32,
    pub usage_stats: u32,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            reflection: 40,
            time_alternative: 30,
            breathing: 20,
            usage_stats: 10,
        }
    }
}

impl BaseWeights {
    pub fn entries(&self) -> [(ContentCategory, u32); 4] {
        [
            (ContentCategory::Reflection, self.reflection),
            (ContentCategory::TimeAlternative, self.time_alternative),
            (ContentCategory::Breathing, self.breathing),
            (ContentCategory::UsageStats, self.usage_stats),
        ]
    }
}

/// Context overrides: a category is raised to a share (percent) of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub late_night_breathing_share: u32,
    pub quick_reopen_reflection_share: u32,
    pub long_session_time_alternative_share: u32,
    /// Session length above which the time-alternative override applies
    pub long_session_minutes: u64,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            late_night_breathing_share: 50,
            quick_reopen_reflection_share: 60,
            long_session_time_alternative_share: 50,
            long_session_minutes: 15,
        }
    }
}

/// Weights added for the rare categories when their condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Added when a daily goal is set and reached
    pub emotional_appeal_weight: u32,
    /// Added when the streak is at least `gamification_min_streak` days
    pub gamification_weight: u32,
    pub gamification_min_streak: u32,
    /// Added for extended-session interventions outside the night window
    pub activity_suggestion_weight: u32,
    /// Added when today's session count reaches `quote_min_sessions`
    pub quote_weight: u32,
    pub quote_min_sessions: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            emotional_appeal_weight: 10,
            gamification_weight: 8,
            gamification_min_streak: 3,
            activity_suggestion_weight: 12,
            quote_weight: 5,
            quote_min_sessions: 8,
        }
    }
}

/// Selector tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub base_weights: BaseWeights,
    pub overrides: OverrideConfig,
    pub triggers: TriggerConfig,
    /// How many recent presentations to avoid repeating (default: 3)
    pub recent_window: usize,
    /// Outcomes required before effectiveness weighting starts (default: 50)
    pub min_outcomes_for_weighting: usize,
    /// Categories with fewer samples keep their base weight (default: 5)
    pub min_category_samples: u32,
    /// Scales how strongly a rate deviation moves the weight (default: 1.0)
    pub sensitivity: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            base_weights: BaseWeights::default(),
            overrides: OverrideConfig::default(),
            triggers: TriggerConfig::default(),
            recent_window: 3,
            min_outcomes_for_weighting: 50,
            min_category_samples: 5,
            sensitivity: 1.0,
            min_multiplier: 0.5,
            max_multiplier: 2.0,
        }
    }
}
