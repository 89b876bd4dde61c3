//! Non-fatal build warnings
//!
//! Warnings report degraded but successful builds, such as a cache-from image
//! that could not be pulled. They never turn into errors.

use std::sync::Mutex;
use tracing::warn;

/// Receives one human-readable message per warning
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: String);
}

/// Forwards warnings to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn warn(&self, message: String) {
        warn!("{}", message);
    }
}

/// Keeps every warning in memory
#[derive(Debug, Default)]
pub struct CollectWarnings {
    warnings: Mutex<Vec<String>>,
}

impl CollectWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl WarningSink for CollectWarnings {
    fn warn(&self, message: String) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_warnings_keeps_order() {
        let sink = CollectWarnings::new();
        sink.warn("first".to_string());
        sink.warn("second".to_string());

        assert_eq!(sink.warnings(), vec!["first", "second"]);
    }
}
