use crate::algorithms::{GeoidCorrector, Reducer, ReductionPolicy};
use crate::api::types::OutputFormat;
use crate::core::{
    DEFAULT_WINDOW_SECS, HIGH_ACCURACY_THRESHOLD_M, KEEP_FRACTION, MID_ACCURACY_THRESHOLD_M,
    MIN_HIGH_TIER_FIXES,
};
use crate::processing::Sampler;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Capture and reduction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Length of one capture window (seconds)
    pub window_secs: u32,
    /// Preferred-pool accuracy bar (meters)
    pub high_accuracy_threshold_m: f64,
    /// Fallback-pool accuracy bar (meters)
    pub mid_accuracy_threshold_m: f64,
    /// Minimum high-tier size before the high tier is used
    pub min_high_tier_fixes: usize,
    /// Fraction of the ranked pool kept by the trimmed mean
    pub keep_fraction: f64,
    /// Reject fixes with non-finite or out-of-range coordinates
    pub reject_invalid_coordinates: bool,
    /// Preferred output rendering for reduced coordinates
    pub output_format: OutputFormat,
    /// Log level for diagnostics
    pub log_level: LogLevel,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            high_accuracy_threshold_m: HIGH_ACCURACY_THRESHOLD_M,
            mid_accuracy_threshold_m: MID_ACCURACY_THRESHOLD_M,
            min_high_tier_fixes: MIN_HIGH_TIER_FIXES,
            keep_fraction: KEEP_FRACTION,
            reject_invalid_coordinates: true,
            output_format: OutputFormat::Text,
            log_level: LogLevel::Info,
        }
    }
}

impl CaptureConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs as u64)
    }

    /// Reduction thresholds described by this configuration
    pub fn reduction_policy(&self) -> ReductionPolicy {
        ReductionPolicy {
            high_threshold_m: self.high_accuracy_threshold_m,
            mid_threshold_m: self.mid_accuracy_threshold_m,
            min_high_tier_fixes: self.min_high_tier_fixes,
            keep_fraction: self.keep_fraction,
        }
    }

    /// Idle sampler wired with the EGM96 corrector and this configuration
    pub fn build_sampler(&self) -> Sampler {
        Sampler::new(GeoidCorrector::egm96(), Reducer::new(self.reduction_policy()))
            .with_coordinate_validation(self.reject_invalid_coordinates)
    }
}

/// Logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and info messages
    Info,
    /// All messages including debug
    Debug,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    #[error("config I/O error: {message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("config serialization error: {message}")]
    SerializationError { message: String },
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

/// Main configuration manager
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    /// Current capture configuration
    config: CaptureConfig,
    /// Configuration file path
    config_file_path: Option<String>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    /// Get current configuration
    pub fn get_config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: CaptureConfig) -> Result<(), ConfigError> {
        Self::first_error(Self::validate_config(&config))?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: CaptureConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        Self::first_error(Self::validate_config(&config))?;

        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content =
            serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.config_file_path.clone() {
            self.save_to_file(path)
        } else {
            Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            })
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Update the capture window length, returning the previous value
    pub fn set_window_secs(&mut self, window_secs: u32) -> Result<u32, ConfigError> {
        if window_secs == 0 || window_secs > 600 {
            return Err(ConfigError::InvalidParameter {
                parameter: "window_secs".to_string(),
                value: window_secs.to_string(),
                reason: "Capture window must be between 1 and 600 seconds".to_string(),
            });
        }

        let old_value = self.config.window_secs;
        self.config.window_secs = window_secs;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the high-accuracy threshold, returning the previous value
    pub fn set_high_accuracy_threshold(&mut self, threshold_m: f64) -> Result<f64, ConfigError> {
        if !(threshold_m > 0.0) || !threshold_m.is_finite() {
            return Err(ConfigError::InvalidParameter {
                parameter: "high_accuracy_threshold_m".to_string(),
                value: threshold_m.to_string(),
                reason: "Accuracy threshold must be positive".to_string(),
            });
        }
        if threshold_m > self.config.mid_accuracy_threshold_m {
            return Err(ConfigError::InvalidParameter {
                parameter: "high_accuracy_threshold_m".to_string(),
                value: threshold_m.to_string(),
                reason: "High threshold cannot exceed the medium threshold".to_string(),
            });
        }

        let old_value = self.config.high_accuracy_threshold_m;
        self.config.high_accuracy_threshold_m = threshold_m;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the medium-accuracy threshold, returning the previous value
    pub fn set_mid_accuracy_threshold(&mut self, threshold_m: f64) -> Result<f64, ConfigError> {
        if !threshold_m.is_finite() || threshold_m < self.config.high_accuracy_threshold_m {
            return Err(ConfigError::InvalidParameter {
                parameter: "mid_accuracy_threshold_m".to_string(),
                value: threshold_m.to_string(),
                reason: "Medium threshold must be finite and at least the high threshold".to_string(),
            });
        }

        let old_value = self.config.mid_accuracy_threshold_m;
        self.config.mid_accuracy_threshold_m = threshold_m;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the trimmed-mean keep fraction, returning the previous value
    pub fn set_keep_fraction(&mut self, fraction: f64) -> Result<f64, ConfigError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "keep_fraction".to_string(),
                value: fraction.to_string(),
                reason: "Keep fraction must be in (0, 1]".to_string(),
            });
        }

        let old_value = self.config.keep_fraction;
        self.config.keep_fraction = fraction;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Toggle strict coordinate validation, returning the previous value
    pub fn set_coordinate_validation(&mut self, enabled: bool) -> bool {
        let old_value = self.config.reject_invalid_coordinates;
        self.config.reject_invalid_coordinates = enabled;
        self.is_modified = true;
        old_value
    }

    /// Check every parameter and collect all problems
    pub fn validate_config(config: &CaptureConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if config.window_secs == 0 || config.window_secs > 600 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "window_secs".to_string(),
                value: config.window_secs.to_string(),
                reason: "Capture window must be between 1 and 600 seconds".to_string(),
            });
        } else if config.window_secs < 3 {
            result
                .warnings
                .push("Windows shorter than 3 s often collect a single fix".to_string());
        }

        if !(config.high_accuracy_threshold_m > 0.0) || !config.high_accuracy_threshold_m.is_finite() {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "high_accuracy_threshold_m".to_string(),
                value: config.high_accuracy_threshold_m.to_string(),
                reason: "Accuracy threshold must be positive".to_string(),
            });
        }

        if !config.mid_accuracy_threshold_m.is_finite()
            || config.mid_accuracy_threshold_m < config.high_accuracy_threshold_m
        {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "mid_accuracy_threshold_m".to_string(),
                value: config.mid_accuracy_threshold_m.to_string(),
                reason: "Medium threshold must be finite and at least the high threshold".to_string(),
            });
        }

        if config.min_high_tier_fixes == 0 {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "min_high_tier_fixes".to_string(),
                value: "0".to_string(),
                reason: "High tier needs at least one fix".to_string(),
            });
        }

        if !(config.keep_fraction > 0.0 && config.keep_fraction <= 1.0) {
            result.errors.push(ConfigError::InvalidParameter {
                parameter: "keep_fraction".to_string(),
                value: config.keep_fraction.to_string(),
                reason: "Keep fraction must be in (0, 1]".to_string(),
            });
        } else if config.keep_fraction < 0.5 {
            result
                .warnings
                .push("Keep fraction below 0.5 discards most samples".to_string());
        }

        if !config.reject_invalid_coordinates {
            result
                .warnings
                .push("Coordinate validation disabled, malformed fixes reach the geoid lookup".to_string());
        }

        result.is_valid = result.errors.is_empty();
        result
    }

    fn first_error(validation: ValidationResult) -> Result<(), ConfigError> {
        match validation.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("geocapture_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();
        assert_eq!(config.window_secs, 5);
        assert_eq!(config.high_accuracy_threshold_m, 20.0);
        assert_eq!(config.mid_accuracy_threshold_m, 100.0);
        assert_eq!(config.keep_fraction, 0.8);
        assert!(ConfigurationManager::validate_config(&config).is_valid);
    }

    #[test]
    fn test_configuration_manager_creation() {
        let manager = ConfigurationManager::new();
        assert_eq!(manager.get_config().window_secs, 5);
        assert!(!manager.is_modified());
    }

    #[test]
    fn test_invalid_config_collects_all_errors() {
        let config = CaptureConfig {
            window_secs: 0,
            high_accuracy_threshold_m: -1.0,
            mid_accuracy_threshold_m: f64::NAN,
            min_high_tier_fixes: 0,
            keep_fraction: 1.5,
            ..CaptureConfig::default()
        };
        let result = ConfigurationManager::validate_config(&config);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 5);
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let config = CaptureConfig {
            window_secs: 2,
            keep_fraction: 0.3,
            reject_invalid_coordinates: false,
            ..CaptureConfig::default()
        };
        let result = ConfigurationManager::validate_config(&config);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_runtime_adjustment() {
        let mut manager = ConfigurationManager::new();

        assert_eq!(manager.set_window_secs(10).unwrap(), 5);
        assert!(manager.is_modified());
        assert!(manager.set_window_secs(0).is_err());

        assert_eq!(manager.set_high_accuracy_threshold(25.0).unwrap(), 20.0);
        assert!(manager.set_high_accuracy_threshold(150.0).is_err());
        assert!(manager.set_mid_accuracy_threshold(10.0).is_err());
        assert_eq!(manager.set_mid_accuracy_threshold(120.0).unwrap(), 100.0);

        assert!(manager.set_keep_fraction(0.0).is_err());
        assert_eq!(manager.set_keep_fraction(0.9).unwrap(), 0.8);

        assert!(manager.set_coordinate_validation(false));
        assert_eq!(manager.get_config().window_secs, 10);
    }

    #[test]
    fn test_update_config_rejects_invalid() {
        let mut manager = ConfigurationManager::new();
        let bad = CaptureConfig {
            keep_fraction: 0.0,
            ..CaptureConfig::default()
        };
        assert!(manager.update_config(bad).is_err());
        assert!(!manager.is_modified());
    }

    #[test]
    fn test_config_serialization() {
        let mut manager = ConfigurationManager::new();
        manager.set_window_secs(10).unwrap();
        manager.set_high_accuracy_threshold(25.0).unwrap();

        let path = temp_path("roundtrip");
        manager.save_to_file(&path).unwrap();
        assert!(!manager.is_modified());

        let loaded = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(loaded.get_config(), manager.get_config());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "window_secs": 10, "log_level": "debug" }"#).unwrap();

        let manager = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(manager.get_config().window_secs, 10);
        assert_eq!(manager.get_config().log_level, LogLevel::Debug);
        assert_eq!(manager.get_config().high_accuracy_threshold_m, 20.0);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_invalid_config_file() {
        let path = temp_path("invalid");
        fs::write(&path, r#"{ "keep_fraction": 2.0 }"#).unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::InvalidParameter { .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::SerializationError { .. })
        ));

        let _ = fs::remove_file(path);
        assert!(matches!(
            ConfigurationManager::from_file(temp_path("missing")),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_save_without_path() {
        let mut manager = ConfigurationManager::new();
        assert!(manager.save().is_err());
    }

    #[test]
    fn test_build_sampler_uses_policy() {
        let config = CaptureConfig {
            keep_fraction: 1.0,
            ..CaptureConfig::default()
        };
        let mut sampler = config.build_sampler();
        sampler.start_window(config.window()).unwrap();
        sampler
            .on_fix(crate::core::RawFix::new(1.0, 1.0, 1).with_accuracy(5.0))
            .unwrap();
        sampler
            .on_fix(crate::core::RawFix::new(3.0, 3.0, 2).with_accuracy(6.0))
            .unwrap();
        sampler.close_window().unwrap();

        let result = sampler.complete().unwrap();
        assert_eq!(result.kept_count, 2);
        assert!((result.lat - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::None.to_level_filter(), LevelFilter::Off);
        assert_eq!(LogLevel::Debug.to_level_filter(), LevelFilter::Debug);
    }
}
