//! TOML-based application configuration.
//!
//! Stores the timer settings and how the end-of-session cue is delivered.
//! Timer *state* is never persisted; only preferences are.
//!
//! Configuration is stored at `~/.config/studydesk/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
#[cfg(feature = "sound")]
use crate::notify::SoundFileNotifier;
use crate::notify::{Notifier, SilentNotifier, TerminalBell};
use crate::timer::TimerSettings;

/// How the notification cue is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Ring the terminal bell when no sound file is configured, or when
    /// the sound file cannot be played on this machine.
    #[serde(default = "default_true")]
    pub bell: bool,
    /// Audio file (wav, ogg or mp3) played at the end of each session.
    #[serde(default)]
    pub sound_file: Option<PathBuf>,
    /// Playback volume in percent.
    #[serde(default = "default_volume")]
    pub volume: u8,
}

fn default_true() -> bool {
    true
}

fn default_volume() -> u8 {
    100
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            bell: true,
            sound_file: None,
            volume: default_volume(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studydesk/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerSettings,
    #[serde(default)]
    pub notifications: NotificationsConfig,
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
    ) -> std::result::Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Optional fields: accept JSON, fall back to a plain string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location, `<data_dir>/config.toml`.
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

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                CoreError::Config(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(CoreError::Config(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            CoreError::Config(ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })
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

    /// Set a config value by dot-separated key.
    ///
    /// The change is only applied when the resulting timer settings pass
    /// validation. Does not write to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting settings are out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.timer.validate()?;
        *self = updated;
        Ok(())
    }

    /// Timer settings, or the defaults if the file holds out-of-range values.
    pub fn timer_settings(&self) -> TimerSettings {
        match self.timer.validate() {
            Ok(()) => self.timer,
            Err(e) => {
                warn!(error = %e, "invalid timer settings in config, using defaults");
                TimerSettings::default()
            }
        }
    }

    /// Build the notifier described by `[notifications]`.
    ///
    /// A sound file wins over the bell; the bell setting then decides what
    /// plays when the file cannot be.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        let fallback: Arc<dyn Notifier> = if self.notifications.bell {
            Arc::new(TerminalBell::stderr())
        } else {
            Arc::new(SilentNotifier)
        };

        #[cfg(feature = "sound")]
        if let Some(path) = &self.notifications.sound_file {
            match SoundFileNotifier::new(path) {
                Ok(sound) => {
                    return Arc::new(
                        sound
                            .with_volume(self.notifications.volume)
                            .with_fallback(fallback),
                    )
                }
                Err(e) => warn!(error = %e, "ignoring notification sound file"),
            }
        }
        #[cfg(not(feature = "sound"))]
        if self.notifications.sound_file.is_some() {
            warn!("built without the `sound` feature, ignoring notification sound file");
        }

        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nfocus_minutes = 45\n").unwrap();
        assert_eq!(parsed.timer.focus_minutes, 45);
        assert_eq!(parsed.timer.short_break_minutes, 5);
        assert!(parsed.notifications.bell);
        assert!(parsed.notifications.sound_file.is_none());
        assert_eq!(parsed.notifications.volume, 100);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.focus_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("timer.sound_enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("notifications.sound_file").as_deref(), Some("null"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_number_and_bool() {
        let mut cfg = Config::default();
        cfg.set("timer.focus_minutes", "50").unwrap();
        cfg.set("timer.auto_start_breaks", "false").unwrap();
        assert_eq!(cfg.timer.focus_minutes, 50);
        assert!(!cfg.timer.auto_start_breaks);
    }

    #[test]
    fn set_accepts_sound_file_as_plain_path() {
        let mut cfg = Config::default();
        cfg.set("notifications.sound_file", "/tmp/cue.oga").unwrap();
        assert_eq!(
            cfg.notifications.sound_file,
            Some(PathBuf::from("/tmp/cue.oga"))
        );
        assert_eq!(cfg.get("notifications.sound_file").as_deref(), Some("/tmp/cue.oga"));

        assert!(cfg.set("notifications.volume", "300").is_err());
        assert_eq!(cfg.notifications.volume, 100);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("timer.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.sound_enabled", "loud").is_err());
        assert!(cfg.set("timer.focus_minutes", "-3").is_err());
    }

    #[test]
    fn set_rejects_out_of_range_and_keeps_old_value() {
        let mut cfg = Config::default();
        let err = cfg.set("timer.short_break_minutes", "45").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cfg.timer.short_break_minutes, 5);
    }

    #[test]
    fn timer_settings_falls_back_when_invalid() {
        let cfg = Config {
            timer: TimerSettings {
                long_break_interval: 0,
                ..TimerSettings::default()
            },
            ..Config::default()
        };
        assert_eq!(cfg.timer_settings(), TimerSettings::default());
    }

    #[test]
    fn notifier_selection() {
        let mut cfg = Config::default();
        assert_eq!(cfg.notifier().name(), "bell");

        cfg.notifications.bell = false;
        assert_eq!(cfg.notifier().name(), "silent");

        // A missing sound file falls back to the bell setting.
        let dir = tempfile::tempdir().unwrap();
        cfg.notifications.sound_file = Some(dir.path().join("missing.ogg"));
        assert_eq!(cfg.notifier().name(), "silent");
        cfg.notifications.bell = true;
        assert_eq!(cfg.notifier().name(), "bell");
    }

    #[cfg(feature = "sound")]
    #[test]
    fn notifier_prefers_existing_sound_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cue.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let mut cfg = Config::default();
        cfg.notifications.sound_file = Some(path);
        assert_eq!(cfg.notifier().name(), "sound");

        cfg.notifications.bell = false;
        assert_eq!(cfg.notifier().name(), "sound");
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("timer.long_break_minutes", "20").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().timer.long_break_minutes, 20);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = 3").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::LoadFailed { .. })));
    }
}
