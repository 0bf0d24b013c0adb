//! Behavioral context for a single intervention decision.
//!
//! The context is a flat, immutable snapshot derived from usage history at
//! show time. It is embedded in every show and outcome record so later
//! analysis sees exactly what the selector saw.

mod builder;
mod provider;

pub use builder::ContextBuilder;
pub use provider::{StaticUsageHistory, UsageHistoryProvider};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::friction::FrictionTier;

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 05:00 - 11:59
    Morning,
    /// 12:00 - 16:59
    Afternoon,
    /// 17:00 - 21:59
    Evening,
    /// 22:00 - 04:59
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Tunables for the derived context flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// First hour of the late-night window (default: 22)
    pub night_start_hour: u8,
    /// First hour after the late-night window (default: 6)
    pub night_end_hour: u8,
    /// A relaunch sooner than this after a session ended is a quick reopen (default: 120s)
    pub quick_reopen_secs: u64,
    /// Sessions longer than this count as extended (default: 15 min)
    pub extended_session_mins: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 22,
            night_end_hour: 6,
            quick_reopen_secs: 120,
            extended_session_mins: 15,
        }
    }
}

impl ContextConfig {
    /// Whether `hour` falls inside the late-night window.
    pub fn is_night_hour(&self, hour: u32) -> bool {
        let start = self.night_start_hour as u32;
        let end = self.night_end_hour as u32;

        if start == end {
            return false;
        }

        // Overnight window (e.g., 22:00 - 06:00)
        if start > end {
            return hour >= start || hour < end;
        }

        hour >= start && hour < end
    }
}

/// Snapshot of the user's situation at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionContext {
    pub time_of_day: TimeOfDay,
    pub local_hour: u32,
    pub day_of_week: Weekday,
    pub is_weekend: bool,
    pub is_late_night: bool,
    pub current_session_ms: u64,
    pub sessions_today: u32,
    /// `None` when the app has no previous session.
    pub minutes_since_last_session_end: Option<u64>,
    pub quick_reopen_attempt: bool,
    pub is_extended_session: bool,
    pub usage_today_ms: u64,
    pub usage_yesterday_ms: u64,
    pub weekly_average_ms: u64,
    pub daily_goal_ms: Option<u64>,
    pub streak_days: u32,
    pub days_since_install: u32,
    pub best_session_ms: Option<u64>,
    pub friction_tier: FrictionTier,
}

impl InterventionContext {
    pub fn current_session_minutes(&self) -> u64 {
        self.current_session_ms / 60_000
    }

    /// True when a goal is set and today's usage has reached it.
    pub fn goal_reached(&self) -> bool {
        self.daily_goal_ms
            .map(|goal| self.usage_today_ms >= goal)
            .unwrap_or(false)
    }
}
