//! TOML-based settings for the volume-button monitor.
//!
//! Example:
//!
//! ```toml
//! [monitor]
//! suppress_native_ui = true
//! exact_step_mode = false
//! restore_delay_ms = 100
//! min_volume = 0.05
//! max_volume = 0.95
//! step_tolerance = 0.0005
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a missing file, a
//! missing section, or a missing key all fall back to the values the monitor
//! uses out of the box.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use volume_core::{
    BoundsError, StepBand, VolumeBounds, CANONICAL_STEP, MAX_VOLUME, MIN_VOLUME, STEP_TOLERANCE,
};

use crate::application::monitor::MonitorOptions;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `min_volume` / `max_volume` do not form a valid band.
    #[error("invalid volume bounds: {0}")]
    InvalidBounds(#[from] BoundsError),
}

// ── Settings schema types ─────────────────────────────────────────────────────

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MonitorSettings {
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Monitor behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSection {
    /// Write the baseline back after every press so the system HUD never shows.
    #[serde(default = "default_true")]
    pub suppress_native_ui: bool,
    /// Only canonical single-step deltas count as presses.
    #[serde(default)]
    pub exact_step_mode: bool,
    /// Debounce before the corrective write, in milliseconds.
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
    #[serde(default = "default_min_volume")]
    pub min_volume: f32,
    #[serde(default = "default_max_volume")]
    pub max_volume: f32,
    /// Half-width of the accepted band around the 0.0625 step.
    #[serde(default = "default_step_tolerance")]
    pub step_tolerance: f32,
}

/// Logging settings for the simulator binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_restore_delay_ms() -> u64 {
    100
}
fn default_min_volume() -> f32 {
    MIN_VOLUME
}
fn default_max_volume() -> f32 {
    MAX_VOLUME
}
fn default_step_tolerance() -> f32 {
    STEP_TOLERANCE
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            suppress_native_ui: default_true(),
            exact_step_mode: false,
            restore_delay_ms: default_restore_delay_ms(),
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            step_tolerance: default_step_tolerance(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl MonitorSettings {
    /// Validates the settings and converts them into [`MonitorOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBounds`] when the volume band is invalid.
    pub fn to_options(&self) -> Result<MonitorOptions, ConfigError> {
        let bounds = VolumeBounds::new(self.monitor.min_volume, self.monitor.max_volume)?;
        Ok(MonitorOptions {
            bounds,
            step_band: StepBand::new(CANONICAL_STEP, self.monitor.step_tolerance),
            restore_delay: Duration::from_millis(self.monitor.restore_delay_ms),
        })
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Loads settings from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<MonitorSettings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MonitorSettings::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_settings(path: &Path, settings: &MonitorSettings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("volume_monitor_test_{}", Uuid::new_v4()))
            .join("settings.toml")
    }

    #[test]
    fn test_default_settings_match_monitor_defaults() {
        // Arrange / Act
        let settings = MonitorSettings::default();
        let options = settings.to_options().expect("defaults are valid");

        // Assert
        assert!(settings.monitor.suppress_native_ui);
        assert!(!settings.monitor.exact_step_mode);
        assert_eq!(settings.logging.log_level, "info");
        assert_eq!(options, MonitorOptions::default());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings: MonitorSettings = toml::from_str("").expect("deserialize empty");
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_keys() {
        // Arrange
        let toml_str = r#"
[monitor]
exact_step_mode = true
restore_delay_ms = 250
"#;

        // Act
        let settings: MonitorSettings = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert!(settings.monitor.exact_step_mode);
        assert_eq!(settings.monitor.restore_delay_ms, 250);
        assert!(settings.monitor.suppress_native_ui);
        assert_eq!(settings.monitor.min_volume, 0.05);
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut settings = MonitorSettings::default();
        settings.monitor.min_volume = 0.9;
        settings.monitor.max_volume = 0.1;

        let result = settings.to_options();

        assert!(matches!(result, Err(ConfigError::InvalidBounds(_))));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_settings(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_load_settings_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/settings.toml");
        let settings = load_settings(&path).expect("missing file is not an error");
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn test_save_and_load_settings_round_trip() {
        // Arrange
        let path = temp_path();
        let mut settings = MonitorSettings::default();
        settings.monitor.suppress_native_ui = false;
        settings.monitor.restore_delay_ms = 40;
        settings.logging.log_level = "debug".to_string();

        // Act
        save_settings(&path, &settings).expect("save");
        let loaded = load_settings(&path).expect("load");

        // Assert
        assert_eq!(loaded, settings);

        // Cleanup
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
