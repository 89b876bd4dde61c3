//! File snapshots and change detection
//!
//! A snapshot maps every dependency path to its last modification time. Two
//! snapshots taken at different points in time are compared by [`diff`] to
//! produce a [`ChangeSet`].

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, trace};

/// Modification times of a set of files, keyed by path
pub type FileMap = HashMap<PathBuf, SystemTime>;

/// Errors raised while taking a snapshot
#[derive(Debug, Error)]
pub enum WatchError {
    /// The dependency provider itself failed
    #[error("listing dependencies: {0}")]
    Dependencies(#[source] anyhow::Error),

    /// A dependency exists but could not be inspected
    #[error("unable to stat file {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files added, modified and deleted between two snapshots
///
/// The three lists are disjoint and each one is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Total number of changed paths
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        write!(
            f,
            "added: [{}], modified: [{}], deleted: [{}]",
            join(&self.added),
            join(&self.modified),
            join(&self.deleted)
        )
    }
}

/// Takes a snapshot of the paths returned by `deps`
///
/// The provider is called on every invocation so dependencies computed from
/// the build definition are always current. Paths that disappear between
/// listing and stat are skipped.
pub fn stat<F>(deps: F) -> Result<FileMap, WatchError>
where
    F: FnOnce() -> anyhow::Result<Vec<PathBuf>>,
{
    let paths = deps().map_err(WatchError::Dependencies)?;
    let mut state = FileMap::with_capacity(paths.len());

    for path in paths {
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("could not stat dependency {}: {}", path.display(), e);
                continue;
            }
            Err(source) => return Err(WatchError::Stat { path, source }),
        };

        trace!(path = %path.display(), "stat");
        state.insert(path, modified);
    }

    Ok(state)
}

/// Computes the changes needed to go from `previous` to `current`
pub fn diff(previous: &FileMap, current: &FileMap) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, modified) in current {
        match previous.get(path) {
            None => changes.added.push(path.clone()),
            Some(before) if before != modified => changes.modified.push(path.clone()),
            Some(_) => {}
        }
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            changes.deleted.push(path.clone());
        }
    }

    changes.added.sort();
    changes.modified.sort();
    changes.deleted.sort();
    changes
}
