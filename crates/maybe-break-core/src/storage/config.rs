//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Break schedule (intervals, durations, heads-up lead time)
//! - Smart pause (idle / fullscreen detection, cooldown)
//! - Wellness reminders (blink, posture)
//! - Break messages
//!
//! Configuration is stored at `~/.config/maybe-break/config.toml`.
//! Missing keys fall back to their defaults when the file is parsed, so the
//! core only ever sees a fully populated [`Settings`].

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result, ValidationError};
use crate::settings::Settings;

/// Break schedule configuration. All values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_short_break_interval")]
    pub short_break_interval: u64,
    #[serde(default = "default_short_break_duration")]
    pub short_break_duration: u64,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u64,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration: u64,
    #[serde(default = "default_true")]
    pub long_breaks_enabled: bool,
    #[serde(default = "default_heads_up_duration")]
    pub heads_up_duration: u64,
}

/// Smart pause configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartPauseConfig {
    #[serde(default = "default_true")]
    pub idle_enabled: bool,
    /// Seconds without input before the user counts as idle.
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold: u64,
    #[serde(default = "default_true")]
    pub fullscreen_enabled: bool,
    /// Seconds the environment must stay clear before resuming.
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
}

/// Wellness reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessConfig {
    #[serde(default)]
    pub blink_reminder_enabled: bool,
    #[serde(default = "default_blink_interval")]
    pub blink_reminder_interval: u64,
    #[serde(default)]
    pub posture_reminder_enabled: bool,
    #[serde(default = "default_posture_interval")]
    pub posture_reminder_interval: u64,
}

/// Lines shown on the break overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_messages")]
    pub messages: Vec<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/maybe-break/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub smart_pause: SmartPauseConfig,
    #[serde(default)]
    pub wellness: WellnessConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

// Default functions
fn default_short_break_interval() -> u64 {
    20 * 60
}
fn default_short_break_duration() -> u64 {
    20
}
fn default_long_break_interval() -> u64 {
    60 * 60
}
fn default_long_break_duration() -> u64 {
    5 * 60
}
fn default_heads_up_duration() -> u64 {
    30
}
fn default_idle_threshold() -> u64 {
    5 * 60
}
fn default_cooldown() -> u64 {
    2 * 60
}
fn default_blink_interval() -> u64 {
    10 * 60
}
fn default_posture_interval() -> u64 {
    30 * 60
}
fn default_true() -> bool {
    true
}
fn default_messages() -> Vec<String> {
    [
        "Relax those eyes",
        "Look at something distant",
        "Breathe, relax, and come back",
        "Take a moment to rest your eyes",
        "Drink some water and look away",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            short_break_interval: default_short_break_interval(),
            short_break_duration: default_short_break_duration(),
            long_break_interval: default_long_break_interval(),
            long_break_duration: default_long_break_duration(),
            long_breaks_enabled: true,
            heads_up_duration: default_heads_up_duration(),
        }
    }
}

impl Default for SmartPauseConfig {
    fn default() -> Self {
        Self {
            idle_enabled: true,
            idle_threshold: default_idle_threshold(),
            fullscreen_enabled: true,
            cooldown: default_cooldown(),
        }
    }
}

impl Default for WellnessConfig {
    fn default() -> Self {
        Self {
            blink_reminder_enabled: false,
            blink_reminder_interval: default_blink_interval(),
            posture_reminder_enabled: false,
            posture_reminder_interval: default_posture_interval(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            messages: default_messages(),
        }
    }
}

impl Config {
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
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as seconds")))?
                        .into(),
                ),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default configuration");
            Self::default()
        })
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Update a value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Update a value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Snapshot consumed by the scheduler, smart pause and reminders.
    pub fn settings(&self) -> Settings {
        Settings {
            short_break_interval: self.schedule.short_break_interval,
            short_break_duration: self.schedule.short_break_duration,
            long_break_interval: self.schedule.long_break_interval,
            long_break_duration: self.schedule.long_break_duration,
            long_breaks_enabled: self.schedule.long_breaks_enabled,
            heads_up_duration: self.schedule.heads_up_duration,
            smart_pause_idle_enabled: self.smart_pause.idle_enabled,
            smart_pause_idle_threshold: self.smart_pause.idle_threshold,
            smart_pause_fullscreen_enabled: self.smart_pause.fullscreen_enabled,
            smart_pause_cooldown: self.smart_pause.cooldown,
            blink_reminder_enabled: self.wellness.blink_reminder_enabled,
            blink_reminder_interval: self.wellness.blink_reminder_interval,
            posture_reminder_enabled: self.wellness.posture_reminder_enabled,
            posture_reminder_interval: self.wellness.posture_reminder_interval,
        }
    }

    /// Values the scheduler tolerates but that are almost certainly
    /// mistakes.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut problems = Vec::new();
        let mut flag = |field: &str, message: &str| {
            problems.push(ValidationError::InvalidValue {
                field: field.to_string(),
                message: message.to_string(),
            })
        };

        let schedule = &self.schedule;
        if schedule.short_break_interval == 0 {
            flag(
                "schedule.short_break_interval",
                "must be greater than zero; breaks would start every second",
            );
        }
        if schedule.long_breaks_enabled && schedule.long_break_interval < schedule.short_break_interval
        {
            flag(
                "schedule.long_break_interval",
                "shorter than short_break_interval; every break after the first is long",
            );
        }
        if schedule.heads_up_duration >= schedule.short_break_interval
            && schedule.short_break_interval > 0
        {
            flag(
                "schedule.heads_up_duration",
                "not shorter than short_break_interval; heads-up starts immediately",
            );
        }
        if self.smart_pause.idle_enabled && self.smart_pause.idle_threshold == 0 {
            flag(
                "smart_pause.idle_threshold",
                "zero threshold pauses on every poll",
            );
        }
        problems
    }

    /// Pick a break message, if messages are enabled and any exist.
    pub fn pick_message<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        if !self.messages.enabled {
            return None;
        }
        self.messages.messages.choose(rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.schedule.short_break_interval, 1200);
        assert_eq!(parsed.smart_pause.cooldown, 120);
        assert_eq!(parsed.messages.messages.len(), 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [schedule]
            short_break_interval = 1500

            [smart_pause]
            fullscreen_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(parsed.schedule.short_break_interval, 1500);
        assert_eq!(parsed.schedule.short_break_duration, 20);
        assert!(parsed.schedule.long_breaks_enabled);
        assert!(!parsed.smart_pause.fullscreen_enabled);
        assert!(parsed.smart_pause.idle_enabled);
        assert!(!parsed.wellness.blink_reminder_enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("schedule.heads_up_duration").as_deref(), Some("30"));
        assert_eq!(cfg.get("smart_pause.idle_enabled").as_deref(), Some("true"));
        assert!(cfg.get("schedule.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("schedule.short_break_interval", "600").unwrap();
        cfg.apply("smart_pause.fullscreen_enabled", "false").unwrap();
        cfg.apply("messages.messages", r#"["Stretch"]"#).unwrap();
        assert_eq!(cfg.schedule.short_break_interval, 600);
        assert!(!cfg.smart_pause.fullscreen_enabled);
        assert_eq!(cfg.messages.messages, vec!["Stretch".to_string()]);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("schedule.nonexistent", "1").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("schedule.long_breaks_enabled", "maybe").is_err());
        assert!(cfg.apply("schedule.short_break_interval", "-5").is_err());
        assert_eq!(cfg.schedule.short_break_interval, 1200);
    }

    #[test]
    fn settings_mirror_config() {
        let mut cfg = Config::default();
        cfg.smart_pause.cooldown = 0;
        cfg.wellness.posture_reminder_enabled = true;
        let s = cfg.settings();
        assert_eq!(s, Settings {
            smart_pause_cooldown: 0,
            posture_reminder_enabled: true,
            ..Settings::default()
        });
    }

    #[test]
    fn validate_flags_zero_interval() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_empty());

        cfg.schedule.short_break_interval = 0;
        let problems = cfg.validate();
        assert!(problems.iter().any(|p| matches!(
            p,
            ValidationError::InvalidValue { field, .. } if field == "schedule.short_break_interval"
        )));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.schedule.heads_up_duration, 30);

        let mut edited = cfg.clone();
        edited.apply("schedule.heads_up_duration", "45").unwrap();
        edited.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().schedule.heads_up_duration, 45);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "schedule = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn pick_message_respects_toggle() {
        let mut cfg = Config::default();
        let mut rng = StepRng::new(0, 1);
        assert!(cfg.pick_message(&mut rng).is_some());

        cfg.messages.enabled = false;
        assert!(cfg.pick_message(&mut rng).is_none());

        cfg.messages.enabled = true;
        cfg.messages.messages.clear();
        assert!(cfg.pick_message(&mut rng).is_none());
    }
}
