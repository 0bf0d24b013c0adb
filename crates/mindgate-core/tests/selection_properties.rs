//! Property tests for content selection.

use chrono::Weekday;
use mindgate_core::context::TimeOfDay;
use mindgate_core::{
    ContentCatalog, ContentCategory, ContentInstance, ContentPayload, ContentSelector,
    FrictionTier, InterventionContext, InterventionKind, UsageMetric,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

fn payload(category: ContentCategory, n: usize) -> ContentPayload {
    match category {
        ContentCategory::Reflection => ContentPayload::Reflection {
            prompt_key: format!("prompt.{n}"),
        },
        ContentCategory::TimeAlternative => ContentPayload::TimeAlternative {
            alternative_key: format!("alt.{n}"),
            minutes: 10,
        },
        ContentCategory::Breathing => ContentPayload::Breathing {
            inhale_secs: 4,
            hold_secs: 4,
            exhale_secs: 4,
            cycles: 3,
        },
        ContentCategory::UsageStats => ContentPayload::UsageStats {
            metric: UsageMetric::SessionsToday,
        },
        ContentCategory::EmotionalAppeal => ContentPayload::EmotionalAppeal {
            appeal_key: format!("appeal.{n}"),
        },
        ContentCategory::Quote => ContentPayload::Quote {
            quote_key: format!("quote.{n}"),
            author: "anon".into(),
        },
        ContentCategory::Gamification => ContentPayload::Gamification {
            challenge_key: format!("game.{n}"),
            target_streak_days: 7,
        },
        ContentCategory::ActivitySuggestion => ContentPayload::ActivitySuggestion {
            activity_key: format!("activity.{n}"),
            duration_minutes: 5,
        },
    }
}

/// Per-category instance counts: base categories get 1-4, the rest 0-3.
fn catalog_strategy() -> impl Strategy<Value = ContentCatalog> {
    prop::collection::vec(0usize..4, 8).prop_map(|extra| {
        let mut instances = Vec::new();
        for (category, extra) in ContentCategory::ALL.iter().zip(extra) {
            let count = if category.is_base() { extra + 1 } else { extra };
            for n in 0..count {
                instances.push(ContentInstance::new(
                    format!("{}.{n}", category.as_str()),
                    payload(*category, n),
                ));
            }
        }
        ContentCatalog::new(1, instances)
    })
}

prop_compose! {
    fn context_strategy()(
        hour in 0u32..24,
        session_minutes in 0u64..40,
        sessions_today in 0u32..12,
        streak_days in 0u32..10,
        quick_reopen in any::<bool>(),
        goal in prop::option::of(0u64..7_200_000),
        usage_today_ms in 0u64..7_200_000,
    ) -> InterventionContext {
        InterventionContext {
            time_of_day: TimeOfDay::from_hour(hour),
            local_hour: hour,
            day_of_week: Weekday::Tue,
            is_weekend: false,
            is_late_night: !(6..22).contains(&hour),
            current_session_ms: session_minutes * 60_000,
            sessions_today,
            minutes_since_last_session_end: quick_reopen.then_some(1),
            quick_reopen_attempt: quick_reopen,
            is_extended_session: session_minutes > 15,
            usage_today_ms,
            usage_yesterday_ms: 0,
            weekly_average_ms: 0,
            daily_goal_ms: goal,
            streak_days,
            days_since_install: 3,
            best_session_ms: None,
            friction_tier: FrictionTier::Gentle,
        }
    }
}

fn kind_strategy() -> impl Strategy<Value = InterventionKind> {
    prop_oneof![
        Just(InterventionKind::Launch),
        Just(InterventionKind::ExtendedSession),
    ]
}

proptest! {
    #[test]
    fn never_selects_from_an_empty_category(
        catalog in catalog_strategy(),
        ctx in context_strategy(),
        kind in kind_strategy(),
        seed in any::<u64>(),
    ) {
        let selector = ContentSelector::new();
        let mut rng = Mcg128Xsl64::seed_from_u64(seed);
        let counts = catalog.category_counts();

        for _ in 0..20 {
            let instance = selector.select(&ctx, kind, &catalog, None, &[], &mut rng).unwrap();
            prop_assert!(counts.get(&instance.category()).copied().unwrap_or(0) > 0);
            prop_assert!(catalog.get(&instance.id).is_some());
        }
    }

    #[test]
    fn consecutive_picks_differ_unless_pool_is_single(
        catalog in catalog_strategy(),
        ctx in context_strategy(),
        kind in kind_strategy(),
        seed in any::<u64>(),
    ) {
        let selector = ContentSelector::new();
        let mut rng = Mcg128Xsl64::seed_from_u64(seed);
        let counts = catalog.category_counts();
        let mut recent: Vec<String> = Vec::new();

        for _ in 0..30 {
            let instance = selector
                .select(&ctx, kind, &catalog, None, &recent, &mut rng)
                .unwrap();
            if let Some(previous) = recent.first() {
                let pool = counts[&instance.category()];
                if pool > 1 {
                    prop_assert_ne!(previous, &instance.id);
                }
            }
            recent.insert(0, instance.id);
            recent.truncate(3);
        }
    }
}
