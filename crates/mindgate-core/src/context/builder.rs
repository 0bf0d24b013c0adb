//! Builds an [`InterventionContext`] from the usage-history provider.

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike, Utc, Weekday};

use super::{ContextConfig, InterventionContext, TimeOfDay, UsageHistoryProvider};
use crate::error::UsageError;
use crate::friction::{FrictionClassifier, FrictionInputs};

/// Reads usage history and derives the context flags.
///
/// The builder never fails: a provider error for any single field is logged
/// and replaced by that field's zero/absent default.
pub struct ContextBuilder {
    provider: Arc<dyn UsageHistoryProvider>,
    config: ContextConfig,
    friction: FrictionClassifier,
}

impl ContextBuilder {
    pub fn new(provider: Arc<dyn UsageHistoryProvider>) -> Self {
        Self {
            provider,
            config: ContextConfig::default(),
            friction: FrictionClassifier::default(),
        }
    }

    pub fn with_config(
        provider: Arc<dyn UsageHistoryProvider>,
        config: ContextConfig,
        friction: FrictionClassifier,
    ) -> Self {
        Self {
            provider,
            config,
            friction,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Build using the local wall clock.
    pub fn build_now(
        &self,
        target_app: &str,
        session_id: &str,
        recent_latencies_ms: &[u64],
    ) -> InterventionContext {
        self.build(
            target_app,
            session_id,
            recent_latencies_ms,
            Local::now().fixed_offset(),
        )
    }

    /// Build the context as of `now` (local time with its offset).
    ///
    /// `recent_latencies_ms` are the decision latencies of the newest
    /// outcomes, newest first; they only feed the friction classifier.
    pub fn build(
        &self,
        target_app: &str,
        session_id: &str,
        recent_latencies_ms: &[u64],
        now: DateTime<FixedOffset>,
    ) -> InterventionContext {
        let p = &self.provider;
        let now_utc = now.with_timezone(&Utc);

        let usage_today_ms = or_default("usage_today", p.usage_today_ms(target_app));
        let usage_yesterday_ms = or_default("usage_yesterday", p.usage_yesterday_ms(target_app));
        let weekly_average_ms = or_default("weekly_average", p.weekly_average_ms(target_app));
        let sessions_today = or_default("sessions_today", p.sessions_today(target_app));
        let last_session_end = or_default("last_session_end", p.last_session_end(target_app));
        let current_session_ms =
            or_default("current_session", p.current_session_elapsed_ms(session_id));
        let daily_goal_ms = or_default("daily_goal", p.daily_goal_ms(target_app));
        let streak_days = or_default("streak", p.streak_days());
        let install_date = or_default("install_date", p.install_date());
        let best_session_ms = or_default("best_session", p.best_session_ms(target_app));
        let baseline_daily_ms = or_default("baseline", p.baseline_daily_ms(target_app));
        let manual_override = or_default("friction_override", p.friction_override());

        let hour = now.hour();
        let day_of_week = now.weekday();

        // Clock skew can put the last end in the future; treat that as "just now".
        let since_last_end_ms = last_session_end
            .map(|end| (now_utc - end).num_milliseconds().max(0) as u64);
        let quick_reopen_attempt = since_last_end_ms
            .map(|ms| ms < self.config.quick_reopen_secs * 1000)
            .unwrap_or(false);

        let days_since_install = install_date
            .map(|installed| (now_utc - installed).num_days().max(0) as u32)
            .unwrap_or(0);

        let friction = self.friction.classify(&FrictionInputs {
            manual_override,
            days_since_install,
            recent_latencies_ms: recent_latencies_ms.to_vec(),
            baseline_daily_ms,
            weekly_average_ms,
        });
        tracing::debug!(
            "Friction for {}: {:?} via {:?}",
            target_app,
            friction.tier,
            friction.reason
        );

        InterventionContext {
            time_of_day: TimeOfDay::from_hour(hour),
            local_hour: hour,
            day_of_week,
            is_weekend: matches!(day_of_week, Weekday::Sat | Weekday::Sun),
            is_late_night: self.config.is_night_hour(hour),
            current_session_ms,
            sessions_today,
            minutes_since_last_session_end: since_last_end_ms.map(|ms| ms / 60_000),
            quick_reopen_attempt,
            is_extended_session: current_session_ms > self.config.extended_session_mins * 60_000,
            usage_today_ms,
            usage_yesterday_ms,
            weekly_average_ms,
            daily_goal_ms,
            streak_days,
            days_since_install,
            best_session_ms,
            friction_tier: friction.tier,
        }
    }
}

fn or_default<T: Default>(field: &str, result: Result<T, UsageError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Usage history field '{}' unavailable, using default: {}", field, e);
            T::default()
        }
    }
}
