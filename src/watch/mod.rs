//! File change detection and the watch loop

pub mod snapshot;
pub mod trigger;
pub mod watcher;

pub use snapshot::{diff, stat, ChangeSet, FileMap, WatchError};
pub use trigger::{ChannelTrigger, NotifyTrigger, PollTrigger, Trigger};
pub use watcher::{from_fn, ChangeHandler, FnHandler, Watcher};
