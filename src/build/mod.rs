//! Artifact builds against a local image engine

pub mod artifact;
pub mod cache;
pub mod error;
pub mod events;
pub mod local;
pub mod warnings;

pub use artifact::{ArtifactSpec, ArtifactType, BuildResult, DockerArtifact, ImageTags};
pub use cache::resolve_cache_from;
pub use error::BuildError;
pub use events::{BuildEvent, BuildEventHandler, LoggingHandler, NoOpHandler};
pub use local::LocalBuilder;
pub use warnings::{CollectWarnings, LogWarnings, WarningSink};
