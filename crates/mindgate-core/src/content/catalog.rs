//! Static, versioned content catalog.
//!
//! The catalog is loaded once (built-in or from TOML) and never mutated at
//! runtime. [`ContentCatalog::validate`] is the startup gate: a catalog that
//! lacks a base category is rejected before any decision is made.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::category::{ContentCategory, ContentPayload, UsageMetric};
use crate::error::ConfigError;

/// One concrete piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInstance {
    /// Stable id used for repeat-avoidance and effectiveness bucketing.
    pub id: String,
    #[serde(flatten)]
    pub payload: ContentPayload,
}

impl ContentInstance {
    pub fn new(id: impl Into<String>, payload: ContentPayload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn category(&self) -> ContentCategory {
        self.payload.category()
    }
}

/// Versioned set of content instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub version: u32,
    #[serde(default)]
    pub instances: Vec<ContentInstance>,
}

impl ContentCatalog {
    pub fn new(version: u32, instances: Vec<ContentInstance>) -> Self {
        Self { version, instances }
    }

    /// Parse a catalog from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_toml_str(&content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Reject catalogs the selector could not serve from.
    ///
    /// Every base category needs at least one instance, ids must be unique and
    /// non-empty, and each payload must pass its structural check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.id.trim().is_empty() {
                return Err(ConfigError::InvalidInstance {
                    id: instance.id.clone(),
                    message: "id must not be empty".into(),
                });
            }
            if !seen.insert(instance.id.as_str()) {
                return Err(ConfigError::DuplicateInstanceId(instance.id.clone()));
            }
            instance
                .payload
                .check()
                .map_err(|message| ConfigError::InvalidInstance {
                    id: instance.id.clone(),
                    message,
                })?;
        }

        for category in ContentCategory::BASE {
            if !self.has_category(category) {
                return Err(ConfigError::MissingCategory(category));
            }
        }
        Ok(())
    }

    /// Instances of one category, in catalog order.
    pub fn instances_of(&self, category: ContentCategory) -> Vec<&ContentInstance> {
        self.instances
            .iter()
            .filter(|i| i.category() == category)
            .collect()
    }

    pub fn has_category(&self, category: ContentCategory) -> bool {
        self.instances.iter().any(|i| i.category() == category)
    }

    pub fn get(&self, id: &str) -> Option<&ContentInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Instance count per category (categories without instances omitted).
    pub fn category_counts(&self) -> BTreeMap<ContentCategory, usize> {
        let mut counts = BTreeMap::new();
        for instance in &self.instances {
            *counts.entry(instance.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Self {
        use ContentPayload::*;

        let reflection = |id: &str, key: &str| {
            ContentInstance::new(id, Reflection {
                prompt_key: key.into(),
            })
        };
        let alternative = |id: &str, key: &str, minutes: u32| {
            ContentInstance::new(id, TimeAlternative {
                alternative_key: key.into(),
                minutes,
            })
        };
        let breathing = |id: &str, inhale: u32, hold: u32, exhale: u32, cycles: u32| {
            ContentInstance::new(id, Breathing {
                inhale_secs: inhale,
                hold_secs: hold,
                exhale_secs: exhale,
                cycles,
            })
        };
        let stats = |id: &str, metric: UsageMetric| ContentInstance::new(id, UsageStats { metric });

        let instances = vec![
            reflection("reflection.why-now", "reflection.why_now"),
            reflection("reflection.what-looking-for", "reflection.what_looking_for"),
            reflection("reflection.how-feel-after", "reflection.how_feel_after"),
            reflection("reflection.intention", "reflection.intention"),
            reflection("reflection.bored-or-tired", "reflection.bored_or_tired"),
            alternative("alternative.walk", "alternative.walk", 15),
            alternative("alternative.read", "alternative.read_chapter", 20),
            alternative("alternative.call", "alternative.call_friend", 10),
            alternative("alternative.stretch", "alternative.stretch", 5),
            breathing("breathing.box", 4, 4, 4, 4),
            breathing("breathing.478", 4, 7, 8, 3),
            breathing("breathing.calm", 5, 0, 5, 6),
            stats("stats.today-vs-yesterday", UsageMetric::TodayVsYesterday),
            stats("stats.weekly-average", UsageMetric::WeeklyAverage),
            stats("stats.sessions-today", UsageMetric::SessionsToday),
            stats("stats.goal-progress", UsageMetric::GoalProgress),
            ContentInstance::new("appeal.future-self", EmotionalAppeal {
                appeal_key: "appeal.future_self".into(),
            }),
            ContentInstance::new("appeal.people-who-matter", EmotionalAppeal {
                appeal_key: "appeal.people_who_matter".into(),
            }),
            ContentInstance::new("quote.seneca-time", Quote {
                quote_key: "quote.seneca_time".into(),
                author: "Seneca".into(),
            }),
            ContentInstance::new("quote.dillard-days", Quote {
                quote_key: "quote.dillard_days".into(),
                author: "Annie Dillard".into(),
            }),
            ContentInstance::new("game.keep-streak", Gamification {
                challenge_key: "game.keep_streak".into(),
                target_streak_days: 7,
            }),
            ContentInstance::new("game.beat-yesterday", Gamification {
                challenge_key: "game.beat_yesterday".into(),
                target_streak_days: 1,
            }),
            ContentInstance::new("activity.water", ActivitySuggestion {
                activity_key: "activity.drink_water".into(),
                duration_minutes: 2,
            }),
            ContentInstance::new("activity.tidy", ActivitySuggestion {
                activity_key: "activity.tidy_desk".into(),
                duration_minutes: 10,
            }),
        ];

        Self::new(1, instances)
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
