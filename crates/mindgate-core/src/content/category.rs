//! Content categories and their payload shapes.
//!
//! Each category is one persuasive strategy. The payload is a tagged union so
//! the presentation layer can match on the tag; the literal copy is never
//! stored here, only the keys the presentation layer resolves.

use serde::{Deserialize, Serialize};

/// A persuasive strategy.
///
/// The discriminant is stable and is what the SQLite log stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Reflection = 0,
    TimeAlternative = 1,
    Breathing = 2,
    UsageStats = 3,
    EmotionalAppeal = 4,
    Quote = 5,
    Gamification = 6,
    ActivitySuggestion = 7,
}

impl ContentCategory {
    /// Every category, in discriminant order.
    pub const ALL: [ContentCategory; 8] = [
        ContentCategory::Reflection,
        ContentCategory::TimeAlternative,
        ContentCategory::Breathing,
        ContentCategory::UsageStats,
        ContentCategory::EmotionalAppeal,
        ContentCategory::Quote,
        ContentCategory::Gamification,
        ContentCategory::ActivitySuggestion,
    ];

    /// Categories in the base weight table. A catalog must carry all of them.
    pub const BASE: [ContentCategory; 4] = [
        ContentCategory::Reflection,
        ContentCategory::TimeAlternative,
        ContentCategory::Breathing,
        ContentCategory::UsageStats,
    ];

    /// Whether this category participates in the base weight table.
    pub fn is_base(self) -> bool {
        Self::BASE.contains(&self)
    }

    /// Numeric discriminant.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert from the numeric discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Snake-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentCategory::Reflection => "reflection",
            ContentCategory::TimeAlternative => "time_alternative",
            ContentCategory::Breathing => "breathing",
            ContentCategory::UsageStats => "usage_stats",
            ContentCategory::EmotionalAppeal => "emotional_appeal",
            ContentCategory::Quote => "quote",
            ContentCategory::Gamification => "gamification",
            ContentCategory::ActivitySuggestion => "activity_suggestion",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown content category: {s}"))
    }
}

/// Which usage figure a stats card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMetric {
    TodayVsYesterday,
    WeeklyAverage,
    SessionsToday,
    GoalProgress,
    BestSession,
}

/// Concrete content, one shape per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ContentPayload {
    /// An open question the user is asked to consider.
    Reflection { prompt_key: String },
    /// Loss-framed: what else the next `minutes` could buy.
    TimeAlternative { alternative_key: String, minutes: u32 },
    /// A paced breathing exercise.
    Breathing {
        inhale_secs: u32,
        hold_secs: u32,
        exhale_secs: u32,
        cycles: u32,
    },
    UsageStats { metric: UsageMetric },
    EmotionalAppeal { appeal_key: String },
    Quote { quote_key: String, author: String },
    /// A streak-style challenge.
    Gamification {
        challenge_key: String,
        target_streak_days: u32,
    },
    ActivitySuggestion {
        activity_key: String,
        duration_minutes: u32,
    },
}

impl ContentPayload {
    /// The category this payload belongs to.
    pub fn category(&self) -> ContentCategory {
        match self {
            ContentPayload::Reflection { .. } => ContentCategory::Reflection,
            ContentPayload::TimeAlternative { .. } => ContentCategory::TimeAlternative,
            ContentPayload::Breathing { .. } => ContentCategory::Breathing,
            ContentPayload::UsageStats { .. } => ContentCategory::UsageStats,
            ContentPayload::EmotionalAppeal { .. } => ContentCategory::EmotionalAppeal,
            ContentPayload::Quote { .. } => ContentCategory::Quote,
            ContentPayload::Gamification { .. } => ContentCategory::Gamification,
            ContentPayload::ActivitySuggestion { .. } => ContentCategory::ActivitySuggestion,
        }
    }

    /// Structural checks run by catalog validation.
    pub(crate) fn check(&self) -> Result<(), String> {
        fn key(name: &str, value: &str) -> Result<(), String> {
            if value.trim().is_empty() {
                Err(format!("{name} must not be empty"))
            } else {
                Ok(())
            }
        }

        match self {
            ContentPayload::Reflection { prompt_key } => key("prompt_key", prompt_key),
            ContentPayload::TimeAlternative {
                alternative_key,
                minutes,
            } => {
                key("alternative_key", alternative_key)?;
                if *minutes == 0 {
                    return Err("minutes must be positive".into());
                }
                Ok(())
            }
            ContentPayload::Breathing {
                inhale_secs,
                exhale_secs,
                cycles,
                ..
            } => {
                if *inhale_secs == 0 || *exhale_secs == 0 || *cycles == 0 {
                    return Err("inhale, exhale and cycles must be positive".into());
                }
                Ok(())
            }
            ContentPayload::UsageStats { .. } => Ok(()),
            ContentPayload::EmotionalAppeal { appeal_key } => key("appeal_key", appeal_key),
            ContentPayload::Quote { quote_key, .. } => key("quote_key", quote_key),
            ContentPayload::Gamification {
                challenge_key,
                target_streak_days,
            } => {
                key("challenge_key", challenge_key)?;
                if *target_streak_days == 0 {
                    return Err("target_streak_days must be positive".into());
                }
                Ok(())
            }
            ContentPayload::ActivitySuggestion {
                activity_key,
                duration_minutes,
            } => {
                key("activity_key", activity_key)?;
                if *duration_minutes == 0 {
                    return Err("duration_minutes must be positive".into());
                }
                Ok(())
            }
        }
    }
}
