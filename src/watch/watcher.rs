//! The watch loop
//!
//! Every registered component owns a dependency provider, a change handler
//! and the snapshot taken on the previous tick. On each tick the provider is
//! re-run, a new snapshot is diffed against the stored one, and the handler is
//! awaited before the next tick is processed.

use super::snapshot::{diff, stat, ChangeSet, FileMap, WatchError};
use super::trigger::Trigger;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives the changes detected for one component
#[async_trait]
pub trait ChangeHandler: Send {
    async fn on_change(&mut self, changes: &ChangeSet) -> Result<()>;
}

/// Adapter turning a synchronous closure into a [`ChangeHandler`]
pub struct FnHandler<F>(F);

pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&ChangeSet) -> Result<()> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F> ChangeHandler for FnHandler<F>
where
    F: FnMut(&ChangeSet) -> Result<()> + Send,
{
    async fn on_change(&mut self, changes: &ChangeSet) -> Result<()> {
        (self.0)(changes)
    }
}

type DependencyProvider = Box<dyn FnMut() -> Result<Vec<PathBuf>> + Send>;

struct Component {
    name: String,
    deps: DependencyProvider,
    handler: Box<dyn ChangeHandler>,
    state: FileMap,
}

/// Polls registered components for file changes
#[derive(Default)]
pub struct Watcher {
    components: Vec<Component>,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component and takes its baseline snapshot
    ///
    /// Fails when the dependency provider fails.
    pub fn register<D, H>(
        &mut self,
        name: impl Into<String>,
        mut deps: D,
        handler: H,
    ) -> Result<(), WatchError>
    where
        D: FnMut() -> Result<Vec<PathBuf>> + Send + 'static,
        H: ChangeHandler + 'static,
    {
        let name = name.into();
        let state = stat(&mut deps)?;
        debug!(component = %name, files = state.len(), "registered component");

        self.components.push(Component {
            name,
            deps: Box::new(deps),
            handler: Box::new(handler),
            state,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Runs one diffing pass over every component, in registration order
    ///
    /// Returns how many components reported changes. The fresh snapshot always
    /// replaces the stored one, even when the handler fails, so a change is
    /// reported exactly once.
    pub async fn poll(&mut self) -> Result<usize, WatchError> {
        let mut changed = 0;

        for component in &mut self.components {
            let current = stat(&mut component.deps)?;
            let changes = diff(&component.state, &current);
            component.state = current;

            if !changes.has_changes() {
                continue;
            }

            changed += 1;
            info!(component = %component.name, "{}", changes);

            if let Err(e) = component.handler.on_change(&changes).await {
                warn!(component = %component.name, "error handling changes: {:#}", e);
            }
        }

        Ok(changed)
    }

    /// Watches until `stop` is cancelled or the trigger closes
    ///
    /// `stop` is only observed between ticks; a diffing pass that has started
    /// always runs to completion.
    pub async fn run<T>(&mut self, trigger: &mut T, stop: CancellationToken) -> Result<(), WatchError>
    where
        T: Trigger + ?Sized,
    {
        info!(
            components = self.components.len(),
            "watching for changes ({})",
            trigger.describe()
        );

        loop {
            let ticked = tokio::select! {
                biased;
                _ = stop.cancelled() => false,
                tick = trigger.wait() => tick.is_some(),
            };

            if !ticked {
                info!("watch loop stopped");
                return Ok(());
            }

            self.poll().await?;
        }
    }
}
