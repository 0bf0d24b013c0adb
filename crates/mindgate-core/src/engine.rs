//! Intervention engine: the single entry point callers use.
//!
//! A launch or extended-session event goes through three steps that are
//! causally ordered per session id:
//!
//! 1. [`decide`](InterventionEngine::decide) builds the context, selects the
//!    content and writes a show record.
//! 2. [`report_decision`](InterventionEngine::report_decision) appends the
//!    user's answer to that show.
//! 3. [`report_session_end`](InterventionEngine::report_session_end)
//!    optionally patches the final session figures.
//!
//! Different sessions may run through these steps concurrently.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Local, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::content::{ContentCatalog, ContentCategory, ContentInstance};
use crate::context::{ContextBuilder, UsageHistoryProvider};
use crate::effectiveness::{
    EffectivenessReport, EffectivenessTracker, InterventionKind, InterventionOutcome, OutcomeStore,
    PatchStatus, ShowRecord, UserDecision,
};
use crate::error::{CoreError, Result, ValidationError};
use crate::friction::{FrictionClassifier, FrictionTier};
use crate::selector::{ContentSelector, SelectionMode};
use crate::storage::EngineConfig;

/// What the caller should present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub show_id: String,
    pub instance: ContentInstance,
    pub category: ContentCategory,
    pub friction_tier: FrictionTier,
    /// Delay before the proceed control becomes active
    pub delay_ms: u64,
    pub requires_secondary_step: bool,
    pub mode: SelectionMode,
    /// False when the show log rejected the write. A later
    /// `report_decision` for this session will then fail.
    pub show_recorded: bool,
}

pub struct InterventionEngine {
    catalog: ContentCatalog,
    context: ContextBuilder,
    selector: ContentSelector,
    tracker: EffectivenessTracker,
    latency_window: usize,
    rng: Mutex<Mcg128Xsl64>,
}

impl InterventionEngine {
    /// Build an engine seeded from OS entropy.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the catalog or configuration is
    /// invalid. Nothing is selected from an invalid catalog.
    pub fn new(
        catalog: ContentCatalog,
        provider: Arc<dyn UsageHistoryProvider>,
        store: Arc<dyn OutcomeStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        Self::with_rng(catalog, provider, store, config, Mcg128Xsl64::from_entropy())
    }

    /// Build an engine with a fixed seed for reproducible selection.
    pub fn with_seed(
        catalog: ContentCatalog,
        provider: Arc<dyn UsageHistoryProvider>,
        store: Arc<dyn OutcomeStore>,
        config: &EngineConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(catalog, provider, store, config, Mcg128Xsl64::seed_from_u64(seed))
    }

    fn with_rng(
        catalog: ContentCatalog,
        provider: Arc<dyn UsageHistoryProvider>,
        store: Arc<dyn OutcomeStore>,
        config: &EngineConfig,
        rng: Mcg128Xsl64,
    ) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;

        Ok(Self {
            catalog,
            context: ContextBuilder::with_config(
                provider,
                config.context.clone(),
                FrictionClassifier::with_config(config.friction.clone()),
            ),
            selector: ContentSelector::with_config(config.selector.clone()),
            tracker: EffectivenessTracker::with_config(store, config.effectiveness.clone()),
            latency_window: config.friction.latency_window,
            rng: Mutex::new(rng),
        })
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> &EffectivenessTracker {
        &self.tracker
    }

    /// Pick content for an intervention happening now.
    pub fn decide(
        &self,
        target_app: &str,
        session_id: &str,
        kind: InterventionKind,
    ) -> Result<Decision> {
        self.decide_at(target_app, session_id, kind, Local::now().fixed_offset())
    }

    /// Pick content for an intervention at `now` (local time with offset).
    ///
    /// Read failures on the outcome log degrade to cold-start selection with
    /// no recent history; only invalid input or configuration is an error.
    pub fn decide_at(
        &self,
        target_app: &str,
        session_id: &str,
        kind: InterventionKind,
        now: DateTime<FixedOffset>,
    ) -> Result<Decision> {
        require_non_empty("target_app", target_app)?;
        require_non_empty("session_id", session_id)?;
        let now_utc = now.with_timezone(&Utc);

        let latencies = self
            .tracker
            .recent_latencies(self.latency_window)
            .unwrap_or_else(|e| {
                tracing::warn!("Recent latencies unavailable, assuming none: {}", e);
                Vec::new()
            });
        let context = self.context.build(target_app, session_id, &latencies, now);

        let report = match self
            .tracker
            .aggregate_at(self.tracker.config().weighting_window(), now_utc)
        {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Effectiveness report unavailable, using cold start: {}", e);
                None
            }
        };

        // Held from the recent-shows read until the show is written.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let recent_ids: Vec<String> = self
            .tracker
            .store()
            .recent_shows(self.selector.config().recent_window.max(1))
            .map(|shows| shows.into_iter().map(|s| s.instance_id).collect())
            .unwrap_or_else(|e| {
                tracing::warn!("Recent shows unavailable, not avoiding repeats: {}", e);
                Vec::new()
            });

        let instance = self.selector.select(
            &context,
            kind,
            &self.catalog,
            report.as_ref(),
            &recent_ids,
            &mut *rng,
        )?;

        let tier = context.friction_tier;
        let show = ShowRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            target_app: target_app.to_string(),
            kind,
            category: instance.category(),
            instance_id: instance.id.clone(),
            friction_tier: tier,
            context,
            shown_at: now_utc,
            catalog_version: self.catalog.version,
        };

        let show_recorded = match self.tracker.store().record_show(&show) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to record show for session {}: {}", session_id, e);
                false
            }
        };
        drop(rng);

        Ok(Decision {
            show_id: show.id,
            category: show.category,
            instance,
            friction_tier: tier,
            delay_ms: tier.delay_ms(),
            requires_secondary_step: tier.requires_secondary_step(),
            mode: self.selector.mode(report.as_ref()),
            show_recorded,
        })
    }

    /// Record the user's answer to the latest show of `session_id`.
    ///
    /// # Errors
    /// - [`CoreError::DecisionWithoutShow`] if nothing was shown for the session
    /// - [`CoreError::InstanceMismatch`] if `instance_id` is not what was shown
    /// - [`CoreError::DuplicateDecision`] if the show already has an answer
    /// - [`CoreError::OutcomeWrite`] if the log rejects the write
    pub fn report_decision(
        &self,
        session_id: &str,
        instance_id: &str,
        choice: UserDecision,
        latency_ms: u64,
    ) -> Result<InterventionOutcome> {
        self.report_decision_at(session_id, instance_id, choice, latency_ms, Utc::now())
    }

    pub fn report_decision_at(
        &self,
        session_id: &str,
        instance_id: &str,
        choice: UserDecision,
        latency_ms: u64,
        recorded_at: DateTime<Utc>,
    ) -> Result<InterventionOutcome> {
        require_non_empty("session_id", session_id)?;
        let show = self
            .tracker
            .store()
            .latest_show(session_id)?
            .ok_or_else(|| CoreError::DecisionWithoutShow {
                session_id: session_id.to_string(),
            })?;

        if show.instance_id != instance_id {
            return Err(CoreError::InstanceMismatch {
                session_id: session_id.to_string(),
                shown: show.instance_id,
                reported: instance_id.to_string(),
            });
        }

        let outcome = InterventionOutcome::from_show(&show, choice, latency_ms, recorded_at);
        self.tracker.record(&outcome)?;
        Ok(outcome)
    }

    /// Attach final session figures to the session's outcome.
    pub fn report_session_end(
        &self,
        session_id: &str,
        final_duration_ms: u64,
        ended_normally: bool,
    ) -> Result<PatchStatus> {
        self.tracker
            .patch_session_outcome(session_id, final_duration_ms, ended_normally)
    }

    /// Report over the last `window_days` days, or the whole log.
    pub fn get_effectiveness_report(
        &self,
        window_days: Option<u32>,
    ) -> Result<EffectivenessReport> {
        self.tracker.aggregate(window_days)
    }

    /// Categories whose went-back rate sits below the configured floor over
    /// the weighting window.
    pub fn get_underperforming_categories(&self) -> Result<Vec<ContentCategory>> {
        let report = self
            .tracker
            .aggregate(self.tracker.config().weighting_window())?;
        Ok(self.tracker.underperforming(&report))
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must not be empty".into(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticUsageHistory;
    use crate::effectiveness::MemoryOutcomeStore;
    use crate::error::StoreError;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store that can be told to fail show writes or history reads.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryOutcomeStore,
        fail_show_writes: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl FlakyStore {
        fn check_reads(&self) -> std::result::Result<(), StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Locked);
            }
            Ok(())
        }
    }

    impl OutcomeStore for FlakyStore {
        fn record_show(&self, show: &ShowRecord) -> std::result::Result<(), StoreError> {
            if self.fail_show_writes.load(Ordering::SeqCst) {
                return Err(StoreError::QueryFailed("disk full".into()));
            }
            self.inner.record_show(show)
        }

        fn latest_show(
            &self,
            session_id: &str,
        ) -> std::result::Result<Option<ShowRecord>, StoreError> {
            self.inner.latest_show(session_id)
        }

        fn recent_shows(&self, limit: usize) -> std::result::Result<Vec<ShowRecord>, StoreError> {
            self.check_reads()?;
            self.inner.recent_shows(limit)
        }

        fn append_outcome(
            &self,
            outcome: &InterventionOutcome,
        ) -> std::result::Result<(), StoreError> {
            self.inner.append_outcome(outcome)
        }

        fn patch_session(
            &self,
            session_id: &str,
            final_session_ms: u64,
            ended_normally: bool,
        ) -> std::result::Result<PatchStatus, StoreError> {
            self.inner
                .patch_session(session_id, final_session_ms, ended_normally)
        }

        fn outcomes_since(
            &self,
            since: Option<DateTime<Utc>>,
        ) -> std::result::Result<Vec<InterventionOutcome>, StoreError> {
            self.check_reads()?;
            self.inner.outcomes_since(since)
        }

        fn outcome_count(&self) -> std::result::Result<usize, StoreError> {
            self.check_reads()?;
            self.inner.outcome_count()
        }

        fn recent_latencies(&self, limit: usize) -> std::result::Result<Vec<u64>, StoreError> {
            self.check_reads()?;
            self.inner.recent_latencies(limit)
        }
    }

    fn afternoon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 4, 14, 0, 0)
            .unwrap()
    }

    fn engine(history: StaticUsageHistory) -> InterventionEngine {
        InterventionEngine::with_seed(
            ContentCatalog::builtin(),
            Arc::new(history),
            Arc::new(MemoryOutcomeStore::new()),
            &EngineConfig::default(),
            11,
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_catalog_rejected_at_construction() {
        let mut catalog = ContentCatalog::builtin();
        catalog
            .instances
            .retain(|i| i.category() != ContentCategory::Breathing);

        let result = InterventionEngine::new(
            catalog,
            Arc::new(StaticUsageHistory::default()),
            Arc::new(MemoryOutcomeStore::new()),
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_decide_records_show() {
        let engine = engine(StaticUsageHistory::default());
        let decision = engine
            .decide_at("social", "s1", InterventionKind::Launch, afternoon())
            .unwrap();

        assert!(decision.show_recorded);
        assert_eq!(decision.friction_tier, FrictionTier::Gentle);
        assert_eq!(decision.delay_ms, 0);
        assert!(!decision.requires_secondary_step);
        assert_eq!(decision.mode, SelectionMode::ColdStart);

        let show = engine.tracker().store().latest_show("s1").unwrap().unwrap();
        assert_eq!(show.id, decision.show_id);
        assert_eq!(show.instance_id, decision.instance.id);
        assert_eq!(show.catalog_version, 1);
    }

    #[test]
    fn test_empty_session_id_rejected() {
        let engine = engine(StaticUsageHistory::default());
        let err = engine
            .decide_at("social", " ", InterventionKind::Launch, afternoon())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_decision_without_show_rejected() {
        let engine = engine(StaticUsageHistory::default());
        let err = engine
            .report_decision("never-shown", "reflection.why-now", UserDecision::WentBack, 4_000)
            .unwrap_err();
        assert!(matches!(err, CoreError::DecisionWithoutShow { .. }));
    }

    #[test]
    fn test_instance_mismatch_rejected() {
        let engine = engine(StaticUsageHistory::default());
        engine
            .decide_at("social", "s1", InterventionKind::Launch, afternoon())
            .unwrap();

        let err = engine
            .report_decision("s1", "not-what-was-shown", UserDecision::Proceeded, 1_000)
            .unwrap_err();
        assert!(matches!(err, CoreError::InstanceMismatch { .. }));
    }

    #[test]
    fn test_second_decision_for_same_show_rejected() {
        let engine = engine(StaticUsageHistory::default());
        let decision = engine
            .decide_at("social", "s1", InterventionKind::Launch, afternoon())
            .unwrap();

        engine
            .report_decision("s1", &decision.instance.id, UserDecision::WentBack, 6_000)
            .unwrap();
        let err = engine
            .report_decision("s1", &decision.instance.id, UserDecision::Proceeded, 100)
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDecision { .. }));
    }

    #[test]
    fn test_session_end_patches_outcome() {
        let engine = engine(StaticUsageHistory::default());
        let decision = engine
            .decide_at("social", "s1", InterventionKind::Launch, afternoon())
            .unwrap();
        engine
            .report_decision("s1", &decision.instance.id, UserDecision::Proceeded, 2_500)
            .unwrap();

        assert_eq!(
            engine.report_session_end("s1", 300_000, true).unwrap(),
            PatchStatus::Applied
        );
        assert_eq!(
            engine.report_session_end("s1", 300_000, true).unwrap(),
            PatchStatus::AlreadyPatched
        );
        assert_eq!(
            engine.report_session_end("s2", 1, false).unwrap(),
            PatchStatus::NotFound
        );
    }

    #[test]
    fn test_consecutive_decisions_do_not_repeat() {
        let engine = engine(StaticUsageHistory::default());
        let mut previous: Option<String> = None;
        for i in 0..50 {
            let d = engine
                .decide_at("social", &format!("s{i}"), InterventionKind::Launch, afternoon())
                .unwrap();
            assert_ne!(Some(d.instance.id.clone()), previous);
            previous = Some(d.instance.id);
        }
    }

    #[test]
    fn test_failed_show_write_still_returns_content() {
        let store = Arc::new(FlakyStore::default());
        store.fail_show_writes.store(true, Ordering::SeqCst);
        let engine = InterventionEngine::with_seed(
            ContentCatalog::builtin(),
            Arc::new(StaticUsageHistory::default()),
            store.clone(),
            &EngineConfig::default(),
            3,
        )
        .unwrap();

        let decision = engine
            .decide_at("social", "s1", InterventionKind::Launch, afternoon())
            .unwrap();
        assert!(!decision.show_recorded);
        assert!(engine.catalog().get(&decision.instance.id).is_some());

        let err = engine
            .report_decision("s1", &decision.instance.id, UserDecision::WentBack, 5_000)
            .unwrap_err();
        assert!(matches!(err, CoreError::DecisionWithoutShow { .. }));
    }

    #[test]
    fn test_history_read_failures_fall_back_to_cold_start() {
        let now = afternoon();
        let history = StaticUsageHistory {
            install_date: Some(now.with_timezone(&Utc) - Duration::days(40)),
            ..Default::default()
        };
        let store = Arc::new(FlakyStore::default());
        let engine = InterventionEngine::with_seed(
            ContentCatalog::builtin(),
            Arc::new(history),
            store.clone(),
            &EngineConfig::default(),
            5,
        )
        .unwrap();

        for i in 0..50 {
            let session = format!("s{i}");
            let d = engine
                .decide_at("social", &session, InterventionKind::Launch, now)
                .unwrap();
            engine
                .report_decision(&session, &d.instance.id, UserDecision::Proceeded, 1_200)
                .unwrap();
        }
        let healthy = engine
            .decide_at("social", "healthy", InterventionKind::Launch, now)
            .unwrap();
        assert_eq!(healthy.mode, SelectionMode::EffectivenessWeighted);
        assert_eq!(healthy.friction_tier, FrictionTier::Firm);

        store.fail_reads.store(true, Ordering::SeqCst);
        let degraded = engine
            .decide_at("social", "degraded", InterventionKind::Launch, now)
            .unwrap();
        assert_eq!(degraded.mode, SelectionMode::ColdStart);
        assert_eq!(degraded.friction_tier, FrictionTier::Moderate);
        assert!(degraded.show_recorded);
        assert!(engine.catalog().get(&degraded.instance.id).is_some());
    }

    #[test]
    fn test_huge_latencies_do_not_break_decide() {
        let engine = engine(StaticUsageHistory::default());
        for i in 0..5 {
            let session = format!("s{i}");
            let d = engine
                .decide_at("social", &session, InterventionKind::Launch, afternoon())
                .unwrap();
            engine
                .report_decision(&session, &d.instance.id, UserDecision::Proceeded, u64::MAX / 2)
                .unwrap();
        }

        let decision = engine
            .decide_at("social", "next", InterventionKind::Launch, afternoon())
            .unwrap();
        assert!(decision.show_recorded);
        let report = engine.get_effectiveness_report(None).unwrap();
        assert_eq!(report.total_outcomes, 5);
    }
}
