//! Structured logging setup
//!
//! Logging goes through `tracing`; this module installs the subscriber once per
//! process. Output is pretty console text by default, or JSON lines when
//! `DEVLOOP_LOG_JSON=true`. `RUST_LOG` is honoured when set.
//!
//! ```no_run
//! use devloop::util::logging;
//!
//! logging::init_logging(logging::LoggingConfig::from_env());
//! tracing::info!(image = "gcr.io/test/image", "build complete");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Dependencies whose debug output drowns ours
const NOISY_TARGETS: &[&str] = &["bollard", "hyper", "hyper_util", "h2", "reqwest", "notify"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's targets
    pub level: Level,

    /// Emit JSON lines instead of console text
    pub use_json: bool,

    /// Include the module target (e.g. devloop::build::local)
    pub include_target: bool,

    /// Include file and line number
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Reads `DEVLOOP_LOG_LEVEL` and `DEVLOOP_LOG_JSON`
    pub fn from_env() -> Self {
        let level = env::var("DEVLOOP_LOG_LEVEL")
            .map(|v| parse_level(&v))
            .unwrap_or(Level::INFO);

        let use_json = env::var("DEVLOOP_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        if env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }

        let mut filter = EnvFilter::new(format!("devloop={}", self.level));
        for target in NOISY_TARGETS {
            if let Ok(directive) = format!("{}=warn", target).parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }
}

/// Returns `true` for the level names accepted by [`parse_level`]
pub fn is_valid_level(level_str: &str) -> bool {
    matches!(
        level_str.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

/// Parses a level name, case-insensitively; unknown names map to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.filter();

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}
