//! Build lifecycle events

use std::time::Duration;
use tracing::{debug, error, info};

/// Events emitted while a batch is built
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// An artifact build started
    Started { image: String },

    /// A cache-from image is being pulled
    CachePull { image: String, cache_from: String },

    /// An artifact was built and tagged
    Complete {
        image: String,
        tag: String,
        duration: Duration,
    },

    /// An artifact failed; the batch stops here
    Failed { image: String, error: String },
}

/// Handles build events
pub trait BuildEventHandler: Send + Sync {
    fn on_event(&self, event: &BuildEvent);
}

/// Handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl BuildEventHandler for NoOpHandler {
    fn on_event(&self, _event: &BuildEvent) {}
}

/// Handler that logs events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl BuildEventHandler for LoggingHandler {
    fn on_event(&self, event: &BuildEvent) {
        match event {
            BuildEvent::Started { image } => {
                info!(image = %image, "Building");
            }
            BuildEvent::CachePull { image, cache_from } => {
                debug!(image = %image, cache_from = %cache_from, "Pulling cache-from image");
            }
            BuildEvent::Complete {
                image,
                tag,
                duration,
            } => {
                info!(
                    image = %image,
                    tag = %tag,
                    duration_ms = duration.as_millis(),
                    "Build complete"
                );
            }
            BuildEvent::Failed { image, error } => {
                error!(image = %image, error = %error, "Build failed");
            }
        }
    }
}
