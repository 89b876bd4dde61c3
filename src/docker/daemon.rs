use super::context;
use super::reference::split_tag;
use super::{ImageEngine, NoAuth, RegistryAuth};
use crate::build::DockerArtifact;
use crate::util::non_empty_lines;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::image::{BuildImageOptions, CreateImageOptions, PushImageOptions, TagImageOptions};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, trace};

const DEFAULT_TAG: &str = "latest";

/// [`ImageEngine`] backed by the local Docker daemon
pub struct DockerDaemon {
    docker: Docker,
    auth: Arc<dyn RegistryAuth>,
}

impl DockerDaemon {
    /// Connects with the local defaults (`DOCKER_HOST` or the unix socket)
    ///
    /// Fails when the daemon does not answer a ping.
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().context("Failed to connect to Docker")?;
        Self::from_client(docker).await
    }

    pub async fn from_client(docker: Docker) -> Result<Self> {
        docker
            .ping()
            .await
            .context("Docker daemon is not reachable")?;

        if let Ok(version) = docker.version().await {
            debug!(
                "Docker API version: {}",
                version.api_version.unwrap_or_else(|| "unknown".to_string())
            );
        }

        Ok(Self {
            docker,
            auth: Arc::new(NoAuth),
        })
    }

    pub fn with_auth(mut self, auth: Arc<dyn RegistryAuth>) -> Self {
        self.auth = auth;
        self
    }

    async fn repo_digest(&self, tag: &str) -> Result<String> {
        let (repo, _) = split_tag(tag);
        let inspect = self
            .docker
            .inspect_image(tag)
            .await
            .with_context(|| format!("inspecting {}", tag))?;

        inspect
            .repo_digests
            .unwrap_or_default()
            .iter()
            .filter_map(|d| d.split_once('@'))
            .find(|(name, _)| *name == repo)
            .map(|(_, digest)| digest.to_string())
            .ok_or_else(|| anyhow!("no digest found for {}", tag))
    }
}

fn push_digest(status: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"digest: ([A-Za-z0-9]+:[0-9a-fA-F]+)").expect("digest regex is valid")
    });
    re.captures(status).map(|c| c[1].to_string())
}

#[async_trait]
impl ImageEngine for DockerDaemon {
    async fn image_id(&self, reference: &str) -> Result<Option<String>> {
        match self.docker.inspect_image(reference).await {
            Ok(inspect) => Ok(inspect.id),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("getting image ID for {}", reference)),
        }
    }

    async fn pull(&self, reference: &str) -> Result<()> {
        let (repo, tag) = split_tag(reference);
        let options = CreateImageOptions {
            from_image: repo,
            tag: tag.unwrap_or(DEFAULT_TAG),
            ..Default::default()
        };

        let mut stream = self
            .docker
            .create_image(Some(options), None, self.auth.credentials(reference));
        while let Some(item) = stream.next().await {
            let info = item.with_context(|| format!("pulling {}", reference))?;
            if let Some(error) = info.error {
                bail!("pulling {}: {}", reference, error);
            }
            if let Some(status) = info.status {
                trace!(image = reference, "{}", status);
            }
        }

        info!("pulled {}", reference);
        Ok(())
    }

    async fn build(
        &self,
        out: &mut (dyn Write + Send),
        artifact: &DockerArtifact,
        tag: &str,
    ) -> Result<String> {
        let archive = context::archive(&artifact.context, &artifact.dockerfile)?;
        debug!(
            "sending {} byte build context for {}",
            archive.len(),
            tag
        );

        let options = BuildImageOptions {
            dockerfile: artifact.dockerfile.clone(),
            t: tag.to_string(),
            buildargs: artifact
                .build_args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
            cachefrom: artifact.cache_from.clone(),
            target: artifact.target.clone().unwrap_or_default(),
            rm: true,
            ..Default::default()
        };

        let mut image_id = None;
        let mut stream = self
            .docker
            .build_image(options, None, Some(Bytes::from(archive)));
        while let Some(item) = stream.next().await {
            let info = item.with_context(|| format!("building {}", tag))?;
            if let Some(error) = info.error {
                bail!("building {}: {}", tag, error);
            }
            if let Some(text) = info.stream {
                for line in non_empty_lines(text.as_bytes()) {
                    writeln!(out, "{}", line).context("writing build output")?;
                }
            }
            if let Some(id) = info.aux.and_then(|aux| aux.id) {
                image_id = Some(id);
            }
        }

        Ok(image_id.unwrap_or_else(|| tag.to_string()))
    }

    async fn push(&self, local_ref: &str, tag: &str) -> Result<String> {
        self.tag(local_ref, tag).await?;

        let (repo, tag_part) = split_tag(tag);
        let options = PushImageOptions {
            tag: tag_part.unwrap_or(DEFAULT_TAG),
        };

        let mut digest = None;
        let mut stream = self
            .docker
            .push_image(repo, Some(options), self.auth.credentials(tag));
        while let Some(item) = stream.next().await {
            let info = item.with_context(|| format!("pushing {}", tag))?;
            if let Some(error) = info.error {
                bail!("pushing {}: {}", tag, error);
            }
            if let Some(status) = info.status {
                trace!(image = tag, "{}", status);
                if let Some(found) = push_digest(&status) {
                    digest = Some(found);
                }
            }
        }

        match digest {
            Some(digest) => Ok(digest),
            None => self.repo_digest(tag).await,
        }
    }

    async fn tag(&self, image: &str, new_tag: &str) -> Result<()> {
        let (repo, tag) = split_tag(new_tag);
        let options = TagImageOptions {
            repo,
            tag: tag.unwrap_or(DEFAULT_TAG),
        };

        self.docker
            .tag_image(image, Some(options))
            .await
            .with_context(|| format!("tagging {} as {}", image, new_tag))
    }
}
