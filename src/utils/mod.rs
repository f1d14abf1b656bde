//! Configuration management

pub mod config;

pub use config::{CaptureConfig, ConfigError, ConfigurationManager, LogLevel, ValidationResult};
