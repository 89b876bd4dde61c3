//! devloop - incremental container image builds for the inner dev loop
//!
//! devloop watches the files each artifact's build depends on and rebuilds
//! only the artifacts whose files changed, against the local Docker daemon.
//!
//! # Core Concepts
//!
//! - **Watching**: the [`watch`] module snapshots dependency modification times,
//!   diffs successive snapshots into a [`ChangeSet`] and drives change handlers
//!   from a [`Trigger`]
//! - **Building**: [`LocalBuilder`] builds a batch of artifacts in order,
//!   pulling cache-from images first, then either tags each image
//!   `<repository>:<n>` or pushes it and reports `<tag>@<digest>`
//! - **Engine**: [`ImageEngine`] is the capability the builder needs from the
//!   local image store, implemented by [`DockerDaemon`] and [`FakeImageEngine`]
//!
//! # Example Usage
//!
//! ```ignore
//! use devloop::{ArtifactSpec, DockerArtifact, DockerDaemon, ImageTags, LocalBuilder};
//! use std::sync::Arc;
//!
//! async fn build() -> anyhow::Result<()> {
//!     let engine = Arc::new(DockerDaemon::connect().await?);
//!     let builder = LocalBuilder::new(engine, false);
//!
//!     let artifacts = vec![ArtifactSpec::docker("gcr.io/test/app", DockerArtifact::default())];
//!     let tags = ImageTags::from([("gcr.io/test/app".into(), "gcr.io/test/app:dev".into())]);
//!
//!     for result in builder.build(&mut std::io::stdout(), &tags, &artifacts).await? {
//!         println!("{} -> {}", result.image_name, result.tag);
//!     }
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod dev;
pub mod docker;
pub mod util;
pub mod watch;

pub use build::{
    ArtifactSpec, ArtifactType, BuildError, BuildResult, DockerArtifact, ImageTags, LocalBuilder,
};
pub use config::{ConfigError, DevloopConfig, TriggerKind};
pub use dev::{DevLoop, RebuildHandler};
pub use docker::{DockerDaemon, FakeImageEngine, ImageEngine};
pub use util::{init_logging, LoggingConfig};
pub use watch::{ChangeHandler, ChangeSet, Trigger, WatchError, Watcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_devloop() {
        assert_eq!(NAME, "devloop");
    }
}
