pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ArtifactArgs, BuildArgs, CliArgs, Commands, DevArgs};
pub use output::{OutputFormat, OutputFormatter};
