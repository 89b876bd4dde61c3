//! Rebuild-on-change driver
//!
//! [`DevLoop`] builds every artifact once, then watches each artifact's build
//! context and rebuilds only the artifact whose files changed. Results are
//! handed off on an mpsc channel.

use crate::build::{
    ArtifactSpec, ArtifactType, BuildResult, DockerArtifact, ImageTags, LocalBuilder,
};
use crate::docker::context;
use crate::util::expand_paths_glob;
use crate::watch::{ChangeHandler, ChangeSet, Trigger, Watcher};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Rebuilds one artifact whenever its dependencies change
pub struct RebuildHandler {
    builder: Arc<LocalBuilder>,
    tags: ImageTags,
    artifact: ArtifactSpec,
    results: mpsc::Sender<Vec<BuildResult>>,
    out: Box<dyn Write + Send>,
}

impl RebuildHandler {
    pub fn new(
        builder: Arc<LocalBuilder>,
        tags: ImageTags,
        artifact: ArtifactSpec,
        results: mpsc::Sender<Vec<BuildResult>>,
    ) -> Self {
        Self {
            builder,
            tags,
            artifact,
            results,
            out: Box::new(std::io::stdout()),
        }
    }

    /// Sends build output to `out` instead of stdout
    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }
}

#[async_trait]
impl ChangeHandler for RebuildHandler {
    async fn on_change(&mut self, _changes: &ChangeSet) -> Result<()> {
        let results = self
            .builder
            .build(
                self.out.as_mut(),
                &self.tags,
                std::slice::from_ref(&self.artifact),
            )
            .await?;

        self.results
            .send(results)
            .await
            .map_err(|_| anyhow!("build results receiver closed"))
    }
}

pub struct DevLoop {
    builder: Arc<LocalBuilder>,
    tags: ImageTags,
    artifacts: Vec<ArtifactSpec>,
    results: mpsc::Sender<Vec<BuildResult>>,
}

impl DevLoop {
    pub fn new(
        builder: Arc<LocalBuilder>,
        tags: ImageTags,
        artifacts: Vec<ArtifactSpec>,
        results: mpsc::Sender<Vec<BuildResult>>,
    ) -> Self {
        Self {
            builder,
            tags,
            artifacts,
            results,
        }
    }

    /// Runs the initial build, then rebuilds on change until `stop` is cancelled
    ///
    /// Baseline snapshots are taken before the initial build, so edits made
    /// while it runs are picked up on the first tick. A failing initial build is
    /// returned; later failures are only logged.
    pub async fn run<T>(&self, trigger: &mut T, stop: CancellationToken) -> Result<()>
    where
        T: Trigger + ?Sized,
    {
        let mut watcher = self.watcher()?;

        let mut out = std::io::stdout();
        let initial = self
            .builder
            .build(&mut out, &self.tags, &self.artifacts)
            .await
            .context("initial build")?;
        self.results
            .send(initial)
            .await
            .map_err(|_| anyhow!("build results receiver closed"))?;

        watcher.run(trigger, stop).await?;
        Ok(())
    }

    fn watcher(&self) -> Result<Watcher> {
        let mut watcher = Watcher::new();

        for artifact in &self.artifacts {
            let Some(ArtifactType::Docker(docker)) = &artifact.artifact_type else {
                warn!("not watching {}: no build method", artifact.image_name);
                continue;
            };

            let docker = docker.clone();
            let handler = RebuildHandler::new(
                self.builder.clone(),
                self.tags.clone(),
                artifact.clone(),
                self.results.clone(),
            );

            watcher
                .register(
                    artifact.image_name.clone(),
                    move || watched_files(&docker),
                    handler,
                )
                .with_context(|| format!("watching {}", artifact.image_name))?;
        }

        Ok(watcher)
    }
}

/// Build context files plus the artifact's extra watch patterns, sorted
pub fn watched_files(docker: &DockerArtifact) -> Result<Vec<PathBuf>> {
    let mut files = context::dependencies(&docker.context, &docker.dockerfile)?;
    if !docker.watch.is_empty() {
        files.extend(expand_paths_glob(&docker.context, &docker.watch)?);
        files.sort();
        files.dedup();
    }
    Ok(files)
}
