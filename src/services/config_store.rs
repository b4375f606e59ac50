// Configuration Storage Service
// Handles config file read/write, environment overrides and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::detection::matcher::MatchSettings;
use crate::services::moderation::{ModerationError, ModerationPolicy};

const CONFIG_FILE_NAME: &str = "config.json";
const BACKUPS_TO_KEEP: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no config directory available on this platform")]
    NoConfigDir,
    #[error("invalid moderation policy: {0}")]
    Policy(#[from] ModerationError),
}

fn io_err(context: &str) -> impl FnOnce(std::io::Error) -> ConfigError + '_ {
    move |source| ConfigError::Io {
        context: context.to_string(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub moderation: ModerationPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_fuzzy_min_len")]
    pub fuzzy_min_len: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            fuzzy_threshold: 0.9,
            fuzzy_min_len: 3,
        }
    }
}

impl DetectionConfig {
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            fuzzy_threshold: self.fuzzy_threshold.clamp(0.0, 1.0),
            fuzzy_min_len: self.fuzzy_min_len.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub file_logging: bool,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_keep_files")]
    pub keep_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            log_dir: None,
            keep_files: 30,
        }
    }
}

fn default_cache_capacity() -> usize { 1000 }
fn default_fuzzy_threshold() -> f64 { 0.9 }
fn default_fuzzy_min_len() -> usize { 3 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }
fn default_keep_files() -> usize { 30 }

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

impl AppConfig {
    /// Apply `TYPEAWARE_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if env_flag("TYPEAWARE_DISABLE_FILE_LOG") {
            self.logging.file_logging = false;
        }
        if let Ok(dir) = std::env::var("TYPEAWARE_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.logging.log_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(level) = std::env::var("TYPEAWARE_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_string();
            }
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        Self { config_dir, config_file }
    }

    /// Store rooted at the platform config directory.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::default_config_dir()
            .map(Self::new)
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("typeaware"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(io_err("Failed to create config dir"))
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            debug!("[config_store] no config at {}, using defaults", self.config_file.display());
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(io_err("Failed to read config"))?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.moderation.validate()?;
        Ok(config)
    }

    /// Load and then apply environment overrides.
    pub fn load_with_env(&self) -> Result<AppConfig, ConfigError> {
        let mut config = self.load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(io_err("Failed to write config"))
    }

    fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(io_err("Failed to create backup dir"))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(io_err("Failed to create backup"))?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_TO_KEEP)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(io_err("Failed to read backup dir"))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names embed the timestamp, so lexical order is age order.
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!("[config_store] failed to remove old backup {}: {}", entry.path().display(), e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.cache_capacity, 1000);
        assert_eq!(config.detection.fuzzy_threshold, 0.9);
        assert_eq!(config.moderation.warning_reset_days, 30);
        assert!(config.logging.file_logging);
    }

    #[test]
    fn test_partial_json_uses_field_defaults() {
        let parsed: AppConfig = serde_json::from_str(r#"{"detection": {"cacheCapacity": 5}}"#).unwrap();
        assert_eq!(parsed.detection.cache_capacity, 5);
        assert_eq!(parsed.detection.fuzzy_min_len, 3);
        assert_eq!(parsed.moderation, ModerationPolicy::default());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_load_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        let mut config = AppConfig {
            version: "1.0.0".to_string(),
            ..AppConfig::default()
        };
        store.save(&config).unwrap();
        config.detection.cache_capacity = 42;
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, "1.0.0");
        assert_eq!(loaded.detection.cache_capacity, 42);

        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert!(matches!(store.load(), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_unusable_policy_durations_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let huge = i64::MAX / 2;
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            format!(r#"{{"moderation": {{"highSuspensionHours": {}}}}}"#, huge),
        )
        .unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.load(),
            Err(ConfigError::Policy(ModerationError::InvalidDuration(h))) if h == huge
        ));

        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"moderation": {"warningResetDays": 0}}"#).unwrap();
        assert!(matches!(
            store.load(),
            Err(ConfigError::Policy(ModerationError::InvalidResetPeriod(0)))
        ));
    }

    #[test]
    fn test_match_settings_are_clamped() {
        let config = DetectionConfig {
            cache_capacity: 1,
            fuzzy_threshold: 1.7,
            fuzzy_min_len: 0,
        };
        let settings = config.match_settings();
        assert_eq!(settings.fuzzy_threshold, 1.0);
        assert_eq!(settings.fuzzy_min_len, 1);
    }
}
