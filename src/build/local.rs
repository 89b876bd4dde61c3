//! Local build orchestration
//!
//! [`LocalBuilder`] builds a batch of artifacts one after the other against the
//! local image engine. Per artifact:
//!
//! 1. cache-from images are made available (best effort),
//! 2. the image is built,
//! 3. the result is either tagged `<repository>:<n>` for local use or pushed
//!    and pinned to its registry digest.
//!
//! The first failing artifact stops the batch and no results are returned.

use super::artifact::{ArtifactSpec, ArtifactType, BuildResult, ImageTags};
use super::cache::resolve_cache_from;
use super::error::BuildError;
use super::events::{BuildEvent, BuildEventHandler, LoggingHandler};
use super::warnings::{LogWarnings, WarningSink};
use crate::docker::{repository, Digest, ImageEngine};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct LocalBuilder {
    engine: Arc<dyn ImageEngine>,
    push_images: bool,
    /// Suffix source for local tags; the first build gets 1
    build_counter: AtomicU64,
    warnings: Arc<dyn WarningSink>,
    events: Arc<dyn BuildEventHandler>,
}

impl LocalBuilder {
    pub fn new(engine: Arc<dyn ImageEngine>, push_images: bool) -> Self {
        Self {
            engine,
            push_images,
            build_counter: AtomicU64::new(0),
            warnings: Arc::new(LogWarnings),
            events: Arc::new(LoggingHandler),
        }
    }

    pub fn with_warnings(mut self, warnings: Arc<dyn WarningSink>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn BuildEventHandler>) -> Self {
        self.events = events;
        self
    }

    pub fn push_images(&self) -> bool {
        self.push_images
    }

    /// Builds `artifacts` in order
    ///
    /// `tags` must hold an entry for every artifact name. Results are in
    /// input order; any failure aborts the batch.
    pub async fn build(
        &self,
        out: &mut (dyn Write + Send),
        tags: &ImageTags,
        artifacts: &[ArtifactSpec],
    ) -> Result<Vec<BuildResult>, BuildError> {
        let mut results = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            let image = &artifact.image_name;
            let started = Instant::now();
            self.events.on_event(&BuildEvent::Started {
                image: image.clone(),
            });

            match self.build_artifact(out, tags, artifact).await {
                Ok(tag) => {
                    self.events.on_event(&BuildEvent::Complete {
                        image: image.clone(),
                        tag: tag.clone(),
                        duration: started.elapsed(),
                    });
                    results.push(BuildResult {
                        image_name: image.clone(),
                        tag,
                    });
                }
                Err(e) => {
                    self.events.on_event(&BuildEvent::Failed {
                        image: image.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        Ok(results)
    }

    async fn build_artifact(
        &self,
        out: &mut (dyn Write + Send),
        tags: &ImageTags,
        artifact: &ArtifactSpec,
    ) -> Result<String, BuildError> {
        let image = artifact.image_name.as_str();
        let tag = match tags.get(image) {
            Some(tag) => tag.as_str(),
            None => {
                warn!("no tag assigned to {}", image);
                ""
            }
        };

        writeln!(out, "Building [{}]...", image)?;
        let local_ref = self.run_build(out, artifact, tag).await?;
        debug!(image, local_ref = %local_ref, "image built");

        if self.push_images {
            self.push(image, &local_ref, tag).await
        } else {
            self.tag_local(image, &local_ref, tag).await
        }
    }

    async fn run_build(
        &self,
        out: &mut (dyn Write + Send),
        artifact: &ArtifactSpec,
        tag: &str,
    ) -> Result<String, BuildError> {
        let image = &artifact.image_name;

        match &artifact.artifact_type {
            Some(ArtifactType::Docker(docker)) => {
                resolve_cache_from(
                    self.engine.as_ref(),
                    self.warnings.as_ref(),
                    self.events.as_ref(),
                    image,
                    &docker.cache_from,
                )
                .await;

                self.engine
                    .build(out, docker, tag)
                    .await
                    .map_err(|source| BuildError::ImageBuild {
                        image: image.clone(),
                        source,
                    })
            }
            None => Err(BuildError::UnknownArtifactType {
                image: image.clone(),
            }),
        }
    }

    async fn tag_local(&self, image: &str, local_ref: &str, tag: &str) -> Result<String, BuildError> {
        let image_id = self
            .engine
            .image_id(local_ref)
            .await
            .map_err(|source| BuildError::ImageId {
                image: image.to_string(),
                source,
            })?
            .ok_or_else(|| BuildError::ImageNotFound {
                image: image.to_string(),
            })?;

        let n = self.build_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let local_tag = format!("{}:{}", repository(tag), n);

        self.engine
            .tag(&image_id, &local_tag)
            .await
            .map_err(|source| BuildError::Tag {
                image: image.to_string(),
                source,
            })?;

        Ok(local_tag)
    }

    async fn push(&self, image: &str, local_ref: &str, tag: &str) -> Result<String, BuildError> {
        let digest = self
            .engine
            .push(local_ref, tag)
            .await
            .map_err(|source| BuildError::Push {
                image: image.to_string(),
                source,
            })?;

        let digest = Digest::parse(&digest).map_err(|source| BuildError::InvalidDigest {
            image: image.to_string(),
            source,
        })?;

        Ok(digest.pin(tag))
    }
}
