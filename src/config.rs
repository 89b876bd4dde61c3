//! Configuration management for devloop
//!
//! Settings are loaded from environment variables with defaults. Command-line
//! flags override them.
//!
//! # Environment Variables
//!
//! - `DEVLOOP_PUSH`: Push images instead of tagging locally (true|false) - default: "false"
//! - `DEVLOOP_TRIGGER`: Change trigger (polling|notify) - default: "polling"
//! - `DEVLOOP_POLL_INTERVAL_MS`: Polling interval in milliseconds - default: "1000"
//! - `DEVLOOP_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use devloop::DevloopConfig;
//!
//! let config = DevloopConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use crate::util::logging::is_valid_level;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid trigger: {0}. Valid options: polling, notify")]
    InvalidTrigger(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// What wakes the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerKind {
    #[default]
    Polling,
    Notify,
}

impl FromStr for TriggerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polling" => Ok(TriggerKind::Polling),
            "notify" => Ok(TriggerKind::Notify),
            _ => Err(ConfigError::InvalidTrigger(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Polling => write!(f, "polling"),
            TriggerKind::Notify => write!(f, "notify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevloopConfig {
    /// Push built images and report digests
    pub push: bool,

    pub trigger: TriggerKind,

    /// Polling period, also the settle delay for notify bursts
    pub poll_interval_ms: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for DevloopConfig {
    /// Loads from `DEVLOOP_*` environment variables, falling back to defaults
    /// for missing or unparsable values
    fn default() -> Self {
        let push = env::var("DEVLOOP_PUSH")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let trigger = env::var("DEVLOOP_TRIGGER")
            .ok()
            .and_then(|v| v.parse::<TriggerKind>().ok())
            .unwrap_or_default();

        let poll_interval_ms = env::var("DEVLOOP_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let log_level = env::var("DEVLOOP_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            push,
            trigger,
            poll_interval_ms,
            log_level,
        }
    }
}

impl DevloopConfig {
    /// Checks that the interval is non-zero and the log level is known
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "Poll interval must be at least 1ms".to_string(),
            ));
        }

        if !is_valid_level(&self.log_level) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl fmt::Display for DevloopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Devloop Configuration:")?;
        writeln!(f, "  Push: {}", self.push)?;
        writeln!(f, "  Trigger: {}", self.trigger)?;
        writeln!(f, "  Poll Interval: {}ms", self.poll_interval_ms)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = [
            EnvGuard::unset("DEVLOOP_PUSH"),
            EnvGuard::unset("DEVLOOP_TRIGGER"),
            EnvGuard::unset("DEVLOOP_POLL_INTERVAL_MS"),
            EnvGuard::unset("DEVLOOP_LOG_LEVEL"),
        ];

        let config = DevloopConfig::default();

        assert!(!config.push);
        assert_eq!(config.trigger, TriggerKind::Polling);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_configuration_from_env() {
        let _guards = [
            EnvGuard::set("DEVLOOP_PUSH", "true"),
            EnvGuard::set("DEVLOOP_TRIGGER", "Notify"),
            EnvGuard::set("DEVLOOP_POLL_INTERVAL_MS", "250"),
            EnvGuard::set("DEVLOOP_LOG_LEVEL", "DEBUG"),
        ];

        let config = DevloopConfig::default();

        assert!(config.push);
        assert_eq!(config.trigger, TriggerKind::Notify);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_unparsable_values_fall_back() {
        let _guards = [
            EnvGuard::set("DEVLOOP_PUSH", "maybe"),
            EnvGuard::set("DEVLOOP_TRIGGER", "inotify"),
            EnvGuard::set("DEVLOOP_POLL_INTERVAL_MS", "soon"),
        ];

        let config = DevloopConfig::default();

        assert!(!config.push);
        assert_eq!(config.trigger, TriggerKind::Polling);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    #[serial]
    fn test_validate_rejects_zero_interval() {
        let config = DevloopConfig {
            poll_interval_ms: 0,
            ..DevloopConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    #[serial]
    fn test_validate_rejects_unknown_log_level() {
        let config = DevloopConfig {
            log_level: "verbose".to_string(),
            ..DevloopConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_trigger_kind_parse() {
        assert_eq!("polling".parse::<TriggerKind>(), Ok(TriggerKind::Polling));
        assert_eq!("NOTIFY".parse::<TriggerKind>(), Ok(TriggerKind::Notify));
        assert_eq!(
            "fsevents".parse::<TriggerKind>(),
            Err(ConfigError::InvalidTrigger("fsevents".to_string()))
        );
    }
}
