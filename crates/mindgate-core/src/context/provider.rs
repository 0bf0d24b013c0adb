//! Usage-history provider seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::friction::FrictionTier;

/// Read-only view of the usage/session tracker.
///
/// Every query can fail on its own; the context builder substitutes a safe
/// default for each failed value rather than aborting the decision.
pub trait UsageHistoryProvider: Send + Sync {
    fn usage_today_ms(&self, app: &str) -> Result<u64, UsageError>;
    fn usage_yesterday_ms(&self, app: &str) -> Result<u64, UsageError>;
    fn weekly_average_ms(&self, app: &str) -> Result<u64, UsageError>;
    fn sessions_today(&self, app: &str) -> Result<u32, UsageError>;
    fn last_session_end(&self, app: &str) -> Result<Option<DateTime<Utc>>, UsageError>;
    fn current_session_elapsed_ms(&self, session_id: &str) -> Result<u64, UsageError>;
    fn daily_goal_ms(&self, app: &str) -> Result<Option<u64>, UsageError>;
    fn streak_days(&self) -> Result<u32, UsageError>;
    fn install_date(&self) -> Result<Option<DateTime<Utc>>, UsageError>;
    fn best_session_ms(&self, app: &str) -> Result<Option<u64>, UsageError>;
    /// Average daily usage during the first week after install.
    fn baseline_daily_ms(&self, app: &str) -> Result<Option<u64>, UsageError>;
    fn friction_override(&self) -> Result<Option<FrictionTier>, UsageError>;
}

/// A fixed snapshot answering every query the same way.
///
/// The CLI loads one from JSON; tests build them directly. Missing fields
/// deserialize to the first-launch defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticUsageHistory {
    pub usage_today_ms: u64,
    pub usage_yesterday_ms: u64,
    pub weekly_average_ms: u64,
    pub sessions_today: u32,
    pub last_session_end: Option<DateTime<Utc>>,
    pub current_session_ms: u64,
    pub daily_goal_ms: Option<u64>,
    pub streak_days: u32,
    pub install_date: Option<DateTime<Utc>>,
    pub best_session_ms: Option<u64>,
    pub baseline_daily_ms: Option<u64>,
    pub friction_override: Option<FrictionTier>,
}

impl UsageHistoryProvider for StaticUsageHistory {
    fn usage_today_ms(&self, _app: &str) -> Result<u64, UsageError> {
        Ok(self.usage_today_ms)
    }

    fn usage_yesterday_ms(&self, _app: &str) -> Result<u64, UsageError> {
        Ok(self.usage_yesterday_ms)
    }

    fn weekly_average_ms(&self, _app: &str) -> Result<u64, UsageError> {
        Ok(self.weekly_average_ms)
    }

    fn sessions_today(&self, _app: &str) -> Result<u32, UsageError> {
        Ok(self.sessions_today)
    }

    fn last_session_end(&self, _app: &str) -> Result<Option<DateTime<Utc>>, UsageError> {
        Ok(self.last_session_end)
    }

    fn current_session_elapsed_ms(&self, _session_id: &str) -> Result<u64, UsageError> {
        Ok(self.current_session_ms)
    }

    fn daily_goal_ms(&self, _app: &str) -> Result<Option<u64>, UsageError> {
        Ok(self.daily_goal_ms)
    }

    fn streak_days(&self) -> Result<u32, UsageError> {
        Ok(self.streak_days)
    }

    fn install_date(&self) -> Result<Option<DateTime<Utc>>, UsageError> {
        Ok(self.install_date)
    }

    fn best_session_ms(&self, _app: &str) -> Result<Option<u64>, UsageError> {
        Ok(self.best_session_ms)
    }

    fn baseline_daily_ms(&self, _app: &str) -> Result<Option<u64>, UsageError> {
        Ok(self.baseline_daily_ms)
    }

    fn friction_override(&self) -> Result<Option<FrictionTier>, UsageError> {
        Ok(self.friction_override)
    }
}
