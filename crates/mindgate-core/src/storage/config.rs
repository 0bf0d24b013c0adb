//! TOML-based engine configuration.
//!
//! Every section is `#[serde(default)]`, so a partial file (or none at all)
//! yields the stock tuning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::context::ContextConfig;
use crate::effectiveness::EffectivenessConfig;
use crate::error::ConfigError;
use crate::friction::FrictionConfig;
use crate::selector::SelectorConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Content catalog to load instead of the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    pub context: ContextConfig,
    pub friction: FrictionConfig,
    pub selector: SelectorConfig,
    pub effectiveness: EffectivenessConfig,
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            // Optional fields are absent from the serialized form until set.
            let existing = match obj.get(part) {
                Some(v) => v.clone(),
                None if key == "catalog_path" => serde_json::Value::Null,
                None => return Err(unknown()),
            };

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("set individual fields of a section".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/mindgate"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`, or return the default when the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the data directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The change is in memory
    /// only; call [`save`](Self::save) to persist it.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value does not fit.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` pairs for every leaf setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Reject settings that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.context.night_start_hour > 23 {
            return invalid("context.night_start_hour", "must be 0-23");
        }
        if self.context.night_end_hour > 23 {
            return invalid("context.night_end_hour", "must be 0-23");
        }
        let base_total: u64 = self
            .selector
            .base_weights
            .entries()
            .iter()
            .map(|(_, w)| *w as u64)
            .sum();
        if base_total == 0 {
            return invalid("selector.base_weights", "at least one weight must be positive");
        }
        if !(self.selector.sensitivity >= 0.0) {
            return invalid("selector.sensitivity", "must be non-negative");
        }
        if !(self.selector.min_multiplier > 0.0
            && self.selector.min_multiplier <= self.selector.max_multiplier)
        {
            return invalid(
                "selector.min_multiplier",
                "must be positive and not above max_multiplier",
            );
        }
        let floor = self.effectiveness.underperformance_floor;
        if !(0.0..=1.0).contains(&floor) {
            return invalid("effectiveness.underperformance_floor", "must be within 0.0-1.0");
        }
        if !(0.0..=1.0).contains(&self.friction.min_usage_reduction) {
            return invalid("friction.min_usage_reduction", "must be within 0.0-1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = EngineConfig::from_toml_str(
            "[friction]\nreflexive_latency_ms = 1500\n\n[selector.base_weights]\nreflection = 70\n",
        )
        .unwrap();
        assert_eq!(cfg.friction.reflexive_latency_ms, 1_500);
        assert_eq!(cfg.friction.gentle_period_days, 14);
        assert_eq!(cfg.selector.base_weights.reflection, 70);
        assert_eq!(cfg.selector.base_weights.breathing, 20);
        assert_eq!(cfg.effectiveness.weighting_window_days, 90);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.get("selector.recent_window"), Some("3".to_string()));
        assert_eq!(
            cfg.get("effectiveness.underperformance_floor"),
            Some("0.25".to_string())
        );
        assert_eq!(cfg.get("friction.nonexistent"), None);
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = EngineConfig::default();
        cfg.set("selector.overrides.late_night_breathing_share", "65")
            .unwrap();
        assert_eq!(cfg.selector.overrides.late_night_breathing_share, 65);

        cfg.set("selector.sensitivity", "0.5").unwrap();
        assert_eq!(cfg.selector.sensitivity, 0.5);
    }

    #[test]
    fn set_catalog_path_when_absent() {
        let mut cfg = EngineConfig::default();
        cfg.set("catalog_path", "/tmp/catalog.toml").unwrap();
        assert_eq!(cfg.catalog_path, Some(PathBuf::from("/tmp/catalog.toml")));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = EngineConfig::default();
        assert!(matches!(
            cfg.set("friction.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("friction.gentle_period_days", "soon").is_err());
        assert!(cfg.set("selector", "1").is_err());
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn set_rejects_values_that_fail_validation() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("context.night_start_hour", "30").is_err());
        assert!(cfg.set("selector.min_multiplier", "3.0").is_err());
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn entries_lists_leaf_keys() {
        let entries = EngineConfig::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "selector.base_weights.reflection" && v == "40"));
        assert!(entries.iter().all(|(k, _)| !k.is_empty()));
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = EngineConfig::default();
        cfg.set("friction.latency_window", "40").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.friction.latency_window, 40);
    }
}
