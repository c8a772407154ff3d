use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AudioError, ConfigError};

/// Player configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub default_volume: f32,
    pub volume_min: f32,
    pub volume_max: f32,
    pub loop_by_default: bool,
    pub preferred_device: Option<String>,
    pub log_level: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            volume_min: -1.0,
            volume_max: 1.0,
            loop_by_default: false,
            preferred_device: None,
            log_level: "warn".to_string(),
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.volume_min.is_finite() || !self.volume_max.is_finite() || self.volume_min > self.volume_max {
            return Err(ConfigError::InvalidValue {
                key: "volume_min/volume_max".to_string(),
                reason: format!("{} to {} is not a valid range", self.volume_min, self.volume_max),
            });
        }
        if !self.default_volume.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "default_volume".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::InvalidValue {
                key: "log_level".to_string(),
                reason: format!("unknown level '{}'", self.log_level),
            });
        }
        Ok(())
    }

    pub fn engine_config(&self) -> Result<EngineConfig, AudioError> {
        EngineConfig::new(
            self.volume_min,
            self.volume_max,
            self.default_volume,
            self.loop_by_default,
        )
    }
}

/// Settings the playback engine applies on every session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub volume_min: f32,
    pub volume_max: f32,
    /// Volume at creation, already clamped into range
    pub initial_volume: f32,
    pub loop_by_default: bool,
}

impl EngineConfig {
    pub fn new(volume_min: f32, volume_max: f32, initial_volume: f32, loop_by_default: bool) -> Result<Self, AudioError> {
        if !volume_min.is_finite() || !volume_max.is_finite() || volume_min > volume_max {
            return Err(AudioError::InvalidVolumeRange {
                min: volume_min,
                max: volume_max,
            });
        }
        let initial_volume = if initial_volume.is_finite() {
            initial_volume.clamp(volume_min, volume_max)
        } else {
            volume_max
        };
        Ok(Self {
            volume_min,
            volume_max,
            initial_volume,
            loop_by_default,
        })
    }

    pub fn clamp_volume(&self, value: f32) -> f32 {
        value.clamp(self.volume_min, self.volume_max)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_min: -1.0,
            volume_max: 1.0,
            initial_volume: 1.0,
            loop_by_default: false,
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: PlayerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location. A missing file yields defaults; an
    /// unreadable or invalid one is an error for the caller to report.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_path(Self::get_config_path()?)
    }

    /// Manage the config stored at `config_path`
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        Ok(Self { config, config_path })
    }

    pub fn get_config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply `updater` and persist; an update that fails validation is
    /// rolled back
    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut PlayerConfig),
    {
        let mut updated = self.config.clone();
        updater(&mut updated);
        updated.validate()?;
        self.config = updated;
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ConfigError> {
        self.update_config(|config| {
            config.default_volume = volume.clamp(config.volume_min, config.volume_max);
        })
    }

    pub fn set_preferred_device(&mut self, device: Option<String>) -> Result<(), ConfigError> {
        self.update_config(|config| config.preferred_device = device)
    }

    pub fn set_loop_by_default(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.update_config(|config| config.loop_by_default = enabled)
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = PlayerConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("waveplay");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<PlayerConfig, ConfigError> {
        if !path.exists() {
            return Ok(PlayerConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: PlayerConfig = toml::from_str(&config_content)?;
        config.validate()?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_manager = ConfigManager::with_path(config_path).unwrap();
        (config_manager, temp_dir)
    }

    #[test]
    fn test_player_config_default() {
        let config = PlayerConfig::default();

        assert_eq!(config.default_volume, 1.0);
        assert_eq!(config.volume_min, -1.0);
        assert_eq!(config.volume_max, 1.0);
        assert!(!config.loop_by_default);
        assert_eq!(config.preferred_device, None);
        assert_eq!(config.log_level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = PlayerConfig {
            default_volume: 0.5,
            volume_min: 0.0,
            volume_max: 2.0,
            loop_by_default: true,
            preferred_device: Some("Test Device".to_string()),
            log_level: "debug".to_string(),
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: PlayerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: PlayerConfig = toml::from_str("loop_by_default = true\n").unwrap();
        assert!(config.loop_by_default);
        assert_eq!(config.volume_min, -1.0);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_volume(0.6).unwrap();
        config_manager.set_preferred_device(Some("Test Device".to_string())).unwrap();
        config_manager.set_loop_by_default(true).unwrap();

        let reloaded = ConfigManager::with_path(config_manager.config_path().to_path_buf()).unwrap();
        let loaded_config = reloaded.get_config();
        assert_eq!(loaded_config.default_volume, 0.6);
        assert_eq!(loaded_config.preferred_device, Some("Test Device".to_string()));
        assert!(loaded_config.loop_by_default);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_config(&temp_dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::load_config(&config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_config_reported_to_caller() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "default_volume = \"loud\"\n").unwrap();

        match ConfigManager::with_path(config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            Err(other) => panic!("Expected DeserializationError, got {:?}", other),
            Ok(_) => panic!("Expected the bad config to be reported"),
        }
    }

    #[test]
    fn test_inverted_volume_range_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "volume_min = 1.0\nvolume_max = 0.0\n").unwrap();

        assert!(matches!(
            ConfigManager::load_config(&config_path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_update_rolled_back_when_invalid() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        let result = config_manager.update_config(|config| config.log_level = "loud".to_string());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(config_manager.get_config().log_level, "warn");
    }

    #[test]
    fn test_set_volume_clamps_to_range() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();
        config_manager.set_volume(5.0).unwrap();
        assert_eq!(config_manager.get_config().default_volume, 1.0);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();
        config_manager.set_loop_by_default(true).unwrap();
        config_manager.reset_to_defaults().unwrap();

        let reloaded = ConfigManager::with_path(config_manager.config_path().to_path_buf()).unwrap();
        assert_eq!(reloaded.get_config(), &PlayerConfig::default());
    }

    #[test]
    fn test_engine_config_from_player_config() {
        let config = PlayerConfig {
            default_volume: 3.0,
            volume_min: 0.0,
            volume_max: 2.0,
            ..PlayerConfig::default()
        };
        let engine_config = config.engine_config().unwrap();

        assert_eq!(engine_config.initial_volume, 2.0);
        assert_eq!(engine_config.clamp_volume(-1.0), 0.0);
        assert_eq!(EngineConfig::default(), PlayerConfig::default().engine_config().unwrap());
    }

    #[test]
    fn test_engine_config_rejects_bad_range() {
        assert!(matches!(
            EngineConfig::new(1.0, -1.0, 0.0, false),
            Err(AudioError::InvalidVolumeRange { .. })
        ));
        assert!(EngineConfig::new(f32::NAN, 1.0, 0.0, false).is_err());
    }
}
