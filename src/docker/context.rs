//! Build context enumeration and packaging
//!
//! The files a Docker build depends on are everything in its context that
//! `.dockerignore` does not exclude, plus the Dockerfile itself. The same list
//! feeds the watcher and the tar stream sent to the daemon, so a file that
//! triggers a rebuild is always part of that rebuild.
//!
//! Only `<context>/.dockerignore` is read, and its patterns are anchored at the
//! context root: `vendor` excludes `vendor/` but not `src/vendor/`.

use crate::util::{abs_file, is_hidden_dir};
use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const DOCKERIGNORE: &str = ".dockerignore";

/// Lists the files of a build context as absolute, sorted paths
pub fn dependencies(context: &Path, dockerfile: &str) -> Result<Vec<PathBuf>> {
    let root = std::path::absolute(context)
        .with_context(|| format!("resolving build context {}", context.display()))?;
    let ignore = dockerignore(&root)?;

    // Excluded directories can only be pruned when no `!` pattern could
    // re-include something below them.
    let prune = ignore.clone();
    let can_prune = ignore.num_whitelists() == 0;

    let walker = WalkBuilder::new(&root)
        .standard_filters(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir {
                return true;
            }
            if entry.file_name().to_str().is_some_and(is_hidden_dir) {
                return false;
            }
            !(can_prune && prune.matched_path_or_any_parents(entry.path(), true).is_ignore())
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if ignore
            .matched_path_or_any_parents(entry.path(), false)
            .is_ignore()
        {
            trace!("ignored by {}: {:?}", DOCKERIGNORE, entry.path());
            continue;
        }
        trace!("context file: {:?}", entry.path());
        files.push(entry.into_path());
    }

    let dockerfile = root.join(dockerfile);
    if !files.contains(&dockerfile) {
        files.push(dockerfile);
    }

    files.sort();
    debug!("{} files in build context {}", files.len(), root.display());
    Ok(files)
}

/// Matcher for the context's own `.dockerignore`, empty when there is none
fn dockerignore(root: &Path) -> Result<Gitignore> {
    let path = root.join(DOCKERIGNORE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Gitignore::empty()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    let mut builder = GitignoreBuilder::new(root);
    for line in content.lines() {
        if let Some(pattern) = anchor_pattern(line) {
            builder
                .add_line(Some(path.clone()), &pattern)
                .with_context(|| format!("invalid pattern {:?} in {}", line, path.display()))?;
        }
    }
    builder
        .build()
        .with_context(|| format!("parsing {}", path.display()))
}

/// Rewrites a `.dockerignore` line as a root-anchored gitignore pattern
///
/// Blank lines and comments yield `None`.
fn anchor_pattern(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (negate, pattern) = match line.strip_prefix('!') {
        Some(rest) => ("!", rest.trim()),
        None => ("", line),
    };
    let pattern = pattern
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches('/');
    if pattern.is_empty() {
        return None;
    }

    Some(format!("{}/{}", negate, pattern))
}

/// Packs the build context into a tar archive
///
/// The Dockerfile must exist. Other files that vanish between listing and
/// packing are skipped.
pub fn archive(context: &Path, dockerfile: &str) -> Result<Vec<u8>> {
    let root = std::path::absolute(context)
        .with_context(|| format!("resolving build context {}", context.display()))?;
    abs_file(&root, dockerfile)?;
    let mut builder = tar::Builder::new(Vec::new());

    for path in dependencies(&root, dockerfile)? {
        let name = path.strip_prefix(&root).with_context(|| {
            format!(
                "{} is outside the build context {}",
                path.display(),
                root.display()
            )
        })?;

        match builder.append_path_with_name(&path, name) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("skipping vanished file {}", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("adding {} to context", path.display()))
            }
        }
    }

    builder
        .into_inner()
        .context("Failed to finish build context archive")
}
