//! Configuration for the sweep scheduler

use crate::SweeperError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the past-due sweeper
///
/// # Examples
///
/// ```
/// use todo_sweeper::SweeperConfig;
///
/// let config = SweeperConfig::default();
/// assert_eq!(config.interval_secs, 60);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweep triggers
    /// Default: 60
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run the background sweeper at all
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            enabled: default_enabled(),
        }
    }
}

impl SweeperConfig {
    /// Sweep interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Reject settings the worker cannot run with
    ///
    /// # Errors
    ///
    /// Returns `Config` when `interval_secs` is zero (tokio intervals panic
    /// on a zero period).
    pub fn validate(&self) -> Result<(), SweeperError> {
        if self.interval_secs == 0 {
            return Err(SweeperError::Config(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweeperConfig::default();
        assert_eq!(config.interval_secs, 60);
        assert!(config.enabled);
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SweeperConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SweeperError::Config(_))));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SweeperConfig = toml::from_str("enabled = false").unwrap();
        assert_eq!(config.interval_secs, 60);
        assert!(!config.enabled);

        let config: SweeperConfig = toml::from_str("").unwrap();
        assert_eq!(config, SweeperConfig::default());
    }

    #[test]
    fn test_serde_json() {
        let config = SweeperConfig {
            interval_secs: 5,
            enabled: false,
        };
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: SweeperConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }
}
