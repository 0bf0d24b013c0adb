//! Progressive friction tiers.
//!
//! The tier controls how much an intervention costs the user: a pre-decision
//! delay and, at the upper tiers, a mandatory secondary step (e.g. a breathing
//! pause) before a choice can be registered.
//!
//! ## Tiers
//!
//! - **Gentle**: no delay, first two weeks after install
//! - **Moderate**: 3 second delay, the steady state
//! - **Firm**: 5 second delay plus secondary step, for reflexive dismissal or
//!   no measurable improvement after four weeks
//! - **Locked**: 10 second delay plus secondary step, only via user opt-in
//!
//! Classification is a pure function recomputed on every decision. Nothing
//! about the tier is stored between decisions.

use serde::{Deserialize, Serialize};

/// Friction tier, ordered from least to most friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrictionTier {
    Gentle,
    Moderate,
    Firm,
    Locked,
}

impl FrictionTier {
    /// Numeric tier value (0-3)
    pub fn as_u8(self) -> u8 {
        match self {
            FrictionTier::Gentle => 0,
            FrictionTier::Moderate => 1,
            FrictionTier::Firm => 2,
            FrictionTier::Locked => 3,
        }
    }

    /// Convert from numeric tier value, saturating at Locked
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => FrictionTier::Gentle,
            1 => FrictionTier::Moderate,
            2 => FrictionTier::Firm,
            _ => FrictionTier::Locked,
        }
    }

    /// Delay the presentation layer enforces before a choice is accepted.
    pub fn delay_ms(self) -> u64 {
        match self {
            FrictionTier::Gentle => 0,
            FrictionTier::Moderate => 3_000,
            FrictionTier::Firm => 5_000,
            FrictionTier::Locked => 10_000,
        }
    }

    /// Whether a secondary step must complete before a choice is accepted.
    pub fn requires_secondary_step(self) -> bool {
        matches!(self, FrictionTier::Firm | FrictionTier::Locked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrictionTier::Gentle => "gentle",
            FrictionTier::Moderate => "moderate",
            FrictionTier::Firm => "firm",
            FrictionTier::Locked => "locked",
        }
    }
}

impl std::str::FromStr for FrictionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gentle" => Ok(FrictionTier::Gentle),
            "moderate" => Ok(FrictionTier::Moderate),
            "firm" => Ok(FrictionTier::Firm),
            "locked" => Ok(FrictionTier::Locked),
            other => Err(format!("unknown friction tier: {other}")),
        }
    }
}

/// Which rule produced the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionReason {
    ManualOverride,
    EarlyTenure,
    ReflexiveDismissal,
    NoImprovement,
    Default,
}

/// Thresholds for the classification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionConfig {
    /// Installs younger than this stay Gentle (default: 14 days)
    pub gentle_period_days: u32,
    /// Tenure at which the improvement rule starts applying (default: 28 days)
    pub improvement_check_days: u32,
    /// Average latency below this counts as reflexive dismissal (default: 2s)
    pub reflexive_latency_ms: u64,
    /// How many recent outcomes feed the latency average (default: 30)
    pub latency_window: usize,
    /// Fewer samples than this and the latency rule stays silent (default: 5)
    pub min_latency_samples: usize,
    /// Minimum fractional usage reduction vs. baseline (default: 0.10)
    pub min_usage_reduction: f64,
}

impl Default for FrictionConfig {
    fn default() -> Self {
        Self {
            gentle_period_days: 14,
            improvement_check_days: 28,
            reflexive_latency_ms: 2_000,
            latency_window: 30,
            min_latency_samples: 5,
            min_usage_reduction: 0.10,
        }
    }
}

/// Everything the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionInputs {
    pub manual_override: Option<FrictionTier>,
    pub days_since_install: u32,
    /// Decision latencies of the most recent outcomes, newest first.
    pub recent_latencies_ms: Vec<u64>,
    /// Average daily usage during the first week after install.
    pub baseline_daily_ms: Option<u64>,
    pub weekly_average_ms: u64,
}

/// Tier plus the rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionDecision {
    pub tier: FrictionTier,
    pub reason: FrictionReason,
}

/// Pure friction classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrictionClassifier {
    config: FrictionConfig,
}

impl FrictionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrictionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrictionConfig {
        &self.config
    }

    /// Classify the current tier. Rules are checked in priority order:
    /// override, tenure, latency, improvement, default.
    pub fn classify(&self, inputs: &FrictionInputs) -> FrictionDecision {
        if let Some(tier) = inputs.manual_override {
            return FrictionDecision {
                tier,
                reason: FrictionReason::ManualOverride,
            };
        }

        if inputs.days_since_install < self.config.gentle_period_days {
            return FrictionDecision {
                tier: FrictionTier::Gentle,
                reason: FrictionReason::EarlyTenure,
            };
        }

        if let Some(avg) = self.average_latency_ms(&inputs.recent_latencies_ms) {
            if avg < self.config.reflexive_latency_ms as f64 {
                return FrictionDecision {
                    tier: FrictionTier::Firm,
                    reason: FrictionReason::ReflexiveDismissal,
                };
            }
        }

        if inputs.days_since_install >= self.config.improvement_check_days {
            if let Some(reduction) = usage_reduction(inputs.baseline_daily_ms, inputs.weekly_average_ms)
            {
                if reduction < self.config.min_usage_reduction {
                    return FrictionDecision {
                        tier: FrictionTier::Firm,
                        reason: FrictionReason::NoImprovement,
                    };
                }
            }
        }

        FrictionDecision {
            tier: FrictionTier::Moderate,
            reason: FrictionReason::Default,
        }
    }

    /// Mean over the configured window, or `None` below the sample minimum.
    fn average_latency_ms(&self, latencies: &[u64]) -> Option<f64> {
        let window = &latencies[..latencies.len().min(self.config.latency_window)];
        if window.is_empty() || window.len() < self.config.min_latency_samples {
            return None;
        }
        let sum: u128 = window.iter().map(|&ms| u128::from(ms)).sum();
        Some(sum as f64 / window.len() as f64)
    }
}

/// Fractional reduction of usage relative to the baseline. Negative when
/// usage grew.
fn usage_reduction(baseline_ms: Option<u64>, current_ms: u64) -> Option<f64> {
    let baseline = baseline_ms.filter(|b| *b > 0)? as f64;
    Some((baseline - current_ms as f64) / baseline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(days: u32) -> FrictionInputs {
        FrictionInputs {
            days_since_install: days,
            ..Default::default()
        }
    }

    #[test]
    fn test_tier_conversion() {
        assert_eq!(FrictionTier::Gentle.as_u8(), 0);
        assert_eq!(FrictionTier::Locked.as_u8(), 3);
        assert_eq!(FrictionTier::from_u8(2), FrictionTier::Firm);
        assert_eq!(FrictionTier::from_u8(9), FrictionTier::Locked);
        assert_eq!("firm".parse::<FrictionTier>().unwrap(), FrictionTier::Firm);
    }

    #[test]
    fn test_delay_is_non_decreasing() {
        let tiers = [
            FrictionTier::Gentle,
            FrictionTier::Moderate,
            FrictionTier::Firm,
            FrictionTier::Locked,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].delay_ms() <= pair[1].delay_ms());
        }
        assert!(!FrictionTier::Moderate.requires_secondary_step());
        assert!(FrictionTier::Firm.requires_secondary_step());
        assert!(FrictionTier::Locked.requires_secondary_step());
    }

    #[test]
    fn test_new_install_is_gentle() {
        let decision = FrictionClassifier::new().classify(&inputs(0));
        assert_eq!(decision.tier, FrictionTier::Gentle);
        assert_eq!(decision.reason, FrictionReason::EarlyTenure);
        assert_eq!(decision.tier.delay_ms(), 0);
    }

    #[test]
    fn test_locked_override_wins() {
        let classifier = FrictionClassifier::new();
        for days in [0, 13, 14, 40, 400] {
            let mut i = inputs(days);
            i.manual_override = Some(FrictionTier::Locked);
            i.recent_latencies_ms = vec![100; 30];
            assert_eq!(classifier.classify(&i).tier, FrictionTier::Locked);
        }
    }

    #[test]
    fn test_override_can_lower_tier() {
        let mut i = inputs(40);
        i.manual_override = Some(FrictionTier::Gentle);
        i.recent_latencies_ms = vec![500; 30];
        let decision = FrictionClassifier::new().classify(&i);
        assert_eq!(decision.tier, FrictionTier::Gentle);
        assert_eq!(decision.reason, FrictionReason::ManualOverride);
    }

    #[test]
    fn test_fast_dismissal_is_firm() {
        let mut i = inputs(40);
        i.recent_latencies_ms = vec![1_200; 30];
        let decision = FrictionClassifier::new().classify(&i);
        assert_eq!(decision.tier, FrictionTier::Firm);
        assert_eq!(decision.reason, FrictionReason::ReflexiveDismissal);
    }

    #[test]
    fn test_huge_latencies_average_without_overflow() {
        let mut i = inputs(20);
        i.recent_latencies_ms = vec![u64::MAX; 30];
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_latency_rule_needs_samples() {
        let mut i = inputs(20);
        i.recent_latencies_ms = vec![300, 400];
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_latency_window_uses_newest() {
        let mut i = inputs(20);
        // 30 slow newest entries, then fast older ones outside the window
        i.recent_latencies_ms = vec![6_000; 30];
        i.recent_latencies_ms.extend(vec![100; 100]);
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_no_improvement_after_four_weeks_is_firm() {
        let mut i = inputs(30);
        i.baseline_daily_ms = Some(3_600_000);
        i.weekly_average_ms = 3_500_000;
        let decision = FrictionClassifier::new().classify(&i);
        assert_eq!(decision.tier, FrictionTier::Firm);
        assert_eq!(decision.reason, FrictionReason::NoImprovement);

        i.weekly_average_ms = 2_000_000;
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_improvement_rule_waits_for_tenure() {
        let mut i = inputs(20);
        i.baseline_daily_ms = Some(3_600_000);
        i.weekly_average_ms = 4_000_000;
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_missing_baseline_skips_improvement_rule() {
        let mut i = inputs(60);
        i.weekly_average_ms = 9_000_000;
        assert_eq!(FrictionClassifier::new().classify(&i).tier, FrictionTier::Moderate);
    }

    #[test]
    fn test_classification_is_pure() {
        let classifier = FrictionClassifier::new();
        let mut i = inputs(35);
        i.recent_latencies_ms = vec![2_500, 1_000, 3_000, 1_500, 2_200];
        i.baseline_daily_ms = Some(1_000_000);
        i.weekly_average_ms = 950_000;
        let first = classifier.classify(&i);
        for _ in 0..100 {
            assert_eq!(classifier.classify(&i), first);
        }
    }
}
