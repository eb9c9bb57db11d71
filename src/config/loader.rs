//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the
//! reconciliation configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{ReconConfig, ShiftSchedule};

/// Loads, validates and provides access to reconciliation configuration.
///
/// # File Layout
///
/// ```text
/// config/
/// └── reconciler.yaml   # boundary, schedule, guards, retry policy
/// ```
///
/// # Example
///
/// ```no_run
/// use attendance_reconciler::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/reconciler.yaml").unwrap();
/// println!("Day starts at {}", loader.config().day_start_boundary);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: ReconConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - The file is missing (`ConfigNotFound`)
    /// - The file is not valid YAML for [`ReconConfig`] (`ConfigParseError`)
    /// - A value fails validation (`ConfigurationError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        Self::from_yaml_str(&content, &path_str)
    }

    /// Parses and validates configuration from YAML text.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Example
    ///
    /// ```
    /// use attendance_reconciler::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::from_yaml_str(
    ///     "day_start_boundary: \"05:00:00\"\nmax_shift_duration_hours: 16\n",
    ///     "inline",
    /// )?;
    /// assert_eq!(loader.config().max_shift_duration_hours, 16);
    /// # Ok::<(), attendance_reconciler::error::EngineError>(())
    /// ```
    pub fn from_yaml_str(content: &str, origin: &str) -> EngineResult<Self> {
        let config: ReconConfig =
            serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        Self::from_config(config)
    }

    /// Wraps an already-built configuration after validating it.
    pub fn from_config(config: ReconConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Returns the default shift schedule.
    pub fn default_schedule(&self) -> &ShiftSchedule {
        &self.config.shift_schedule
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> ReconConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn config_path() -> &'static str {
        "./config/reconciler.yaml"
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        let config = loader.config();
        assert_eq!(
            config.day_start_boundary,
            NaiveTime::from_hms_opt(5, 0, 0).unwrap()
        );
        assert_eq!(config.max_shift_duration_hours, 24);
        assert_eq!(config.min_shift_duration_minutes, Some(60));
        assert_eq!(
            config.processing_floor,
            Some(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
        );
    }

    #[test]
    fn test_default_schedule_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let schedule = loader.default_schedule();

        assert_eq!(schedule.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(schedule.end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(schedule.grace_period_minutes, 10);
        assert_eq!(schedule.checkout_tolerance_minutes, 15);
    }

    #[test]
    fn test_retry_policy_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let retry = &loader.config().retry;

        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay_ms, 200);
        assert_eq!(retry.max_delay_ms, 5000);
    }

    #[test]
    fn test_load_missing_file_returns_error() {
        let result = ConfigLoader::load("/nonexistent/reconciler.yaml");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("reconciler.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_invalid_yaml_returns_parse_error() {
        let result = ConfigLoader::from_yaml_str("day_start_boundary: [not, a, time]", "inline");

        match result {
            Err(EngineError::ConfigParseError { path, .. }) => {
                assert_eq!(path, "inline");
            }
            _ => panic!("Expected ConfigParseError"),
        }
    }

    #[test]
    fn test_missing_boundary_returns_parse_error() {
        let result = ConfigLoader::from_yaml_str("max_shift_duration_hours: 12", "inline");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_out_of_range_value_returns_configuration_error() {
        let yaml = "day_start_boundary: \"05:00:00\"\nmax_shift_duration_hours: 72\n";
        let result = ConfigLoader::from_yaml_str(yaml, "inline");

        match result {
            Err(EngineError::ConfigurationError { field, .. }) => {
                assert_eq!(field, "max_shift_duration_hours");
            }
            _ => panic!("Expected ConfigurationError"),
        }
    }
}
