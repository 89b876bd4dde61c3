//! Local image engine capability
//!
//! [`ImageEngine`] is everything the build orchestrator needs from the local
//! image store. [`DockerDaemon`] talks to a Docker daemon through bollard;
//! [`FakeImageEngine`] is an in-memory stand-in with switchable failures.

pub mod context;
pub mod daemon;
pub mod fake;
pub mod reference;

use crate::build::DockerArtifact;
use anyhow::Result;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use std::io::Write;

pub use daemon::DockerDaemon;
pub use fake::FakeImageEngine;
pub use reference::{repository, split_tag, Digest};

#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// ID of the image known locally as `reference`, `None` when absent
    async fn image_id(&self, reference: &str) -> Result<Option<String>>;

    /// Pulls `reference` into the local store
    async fn pull(&self, reference: &str) -> Result<()>;

    /// Builds a Docker artifact tagged `tag`, streaming build output to `out`
    ///
    /// Returns a local reference to the built image.
    async fn build(
        &self,
        out: &mut (dyn Write + Send),
        artifact: &DockerArtifact,
        tag: &str,
    ) -> Result<String>;

    /// Pushes the local image as `tag` and returns the registry digest
    async fn push(&self, local_ref: &str, tag: &str) -> Result<String>;

    /// Adds `new_tag` to an existing local image
    async fn tag(&self, image: &str, new_tag: &str) -> Result<()>;
}

/// Registry credentials, resolved per image reference
pub trait RegistryAuth: Send + Sync {
    fn credentials(&self, reference: &str) -> Option<DockerCredentials>;
}

/// Anonymous registry access
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

impl RegistryAuth for NoAuth {
    fn credentials(&self, _reference: &str) -> Option<DockerCredentials> {
        None
    }
}
