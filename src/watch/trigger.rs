//! Tick sources for the watch loop
//!
//! A trigger decides *when* the watcher re-checks its dependencies. Polling on
//! a timer and reacting to filesystem notifications are both supported; the
//! watcher only ever sees "tick" or "closed".

use crate::util::is_hidden_file;
use anyhow::Result;
use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Source of watch ticks
#[async_trait]
pub trait Trigger: Send {
    /// Waits for the next tick; `None` once the source is exhausted
    async fn wait(&mut self) -> Option<()>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Ticks on a fixed interval
pub struct PollTrigger {
    interval: Interval,
    period: Duration,
}

impl PollTrigger {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        // A slow rebuild must not be followed by a burst of queued ticks.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }
}

#[async_trait]
impl Trigger for PollTrigger {
    async fn wait(&mut self) -> Option<()> {
        self.interval.tick().await;
        Some(())
    }

    fn describe(&self) -> String {
        format!("polling every {}ms", self.period.as_millis())
    }
}

/// Ticks whenever a unit is received on a channel
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    pub fn new(rx: mpsc::Receiver<()>) -> Self {
        Self { rx }
    }

    /// Creates a trigger together with the sender that drives it
    pub fn channel(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    async fn wait(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    fn describe(&self) -> String {
        "manual".to_string()
    }
}

/// Ticks on filesystem notifications below a set of roots
///
/// Events arriving in a burst are coalesced into a single tick. Events that only
/// touch hidden files (editor swap files and the like) are dropped.
pub struct NotifyTrigger {
    rx: mpsc::UnboundedReceiver<Event>,
    roots: Vec<PathBuf>,
    settle: Duration,
    // Dropping the watcher stops the notifications.
    _watcher: RecommendedWatcher,
}

impl NotifyTrigger {
    pub fn new(roots: Vec<PathBuf>, settle: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // The receiver is gone once the trigger is dropped.
                    let _ = tx.send(event);
                }
                Err(err) => warn!("file watch error: {}", err),
            },
            Config::default(),
        )?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            info!("file watcher started on {:?}", root);
        }

        Ok(Self {
            rx,
            roots,
            settle,
            _watcher: watcher,
        })
    }

    fn is_relevant(event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| !is_hidden_file(name))
                .unwrap_or(true)
        })
    }
}

#[async_trait]
impl Trigger for NotifyTrigger {
    async fn wait(&mut self) -> Option<()> {
        loop {
            let event = self.rx.recv().await?;
            if !Self::is_relevant(&event) {
                debug!(?event, "ignoring notify event");
                continue;
            }
            debug!(?event, "received notify event");

            tokio::time::sleep(self.settle).await;
            while self.rx.try_recv().is_ok() {}
            return Some(());
        }
    }

    fn describe(&self) -> String {
        format!("notify on {} root(s)", self.roots.len())
    }
}
