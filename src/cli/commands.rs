use crate::config::TriggerKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Incremental container image builds for inner-loop development
#[derive(Parser, Debug)]
#[command(
    name = "devloop",
    about = "Incremental container image builds for inner-loop development",
    version,
    author,
    long_about = "devloop builds container images against the local Docker daemon. \
                  `build` runs a one-shot batch; `dev` builds once and then rebuilds \
                  each artifact whenever files in its build context change."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build artifacts once and print the results",
        long_about = "Builds every artifact in order, then prints the built references.\n\n\
                      Examples:\n  \
                      devloop build --image gcr.io/test/app\n  \
                      devloop build --artifacts devloop.yaml --push\n  \
                      devloop build --image app --tag '${IMAGE_NAME}:v1' --format yaml"
    )]
    Build(BuildArgs),

    #[command(
        about = "Build, then rebuild on every change",
        long_about = "Runs an initial build, then watches each artifact's build context and \
                      rebuilds the artifact whose files changed. Stop with Ctrl-C.\n\n\
                      Examples:\n  \
                      devloop dev --image app\n  \
                      devloop dev --artifacts devloop.yaml --trigger notify"
    )]
    Dev(DevArgs),
}

/// Which artifacts to build and how to name them
#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    #[arg(
        short = 'a',
        long,
        value_name = "FILE|URL",
        conflicts_with = "image",
        help = "YAML list of artifacts, local or http(s)"
    )]
    pub artifacts: Option<String>,

    #[arg(short = 'i', long, value_name = "NAME", help = "Image name of a single Docker artifact")]
    pub image: Option<String>,

    #[arg(long, value_name = "DIR", default_value = ".", help = "Docker build context")]
    pub context: PathBuf,

    #[arg(long, value_name = "FILE", default_value = "Dockerfile", help = "Dockerfile, relative to the context")]
    pub dockerfile: String,

    #[arg(long = "cache-from", value_name = "IMAGE", help = "Image to reuse layers from (repeatable)")]
    pub cache_from: Vec<String>,

    #[arg(long, value_name = "GLOB", help = "Extra files that trigger rebuilds, relative to the context (repeatable)")]
    pub watch: Vec<String>,

    #[arg(
        short = 't',
        long,
        value_name = "TEMPLATE",
        default_value = "$IMAGE_NAME:latest",
        help = "Tag template; $IMAGE_NAME expands to the artifact name"
    )]
    pub tag: String,

    #[arg(long, help = "Push images and report registry digests")]
    pub push: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    #[arg(short = 'f', long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    #[arg(long, value_parser = parse_trigger, help = "Change trigger: polling or notify")]
    pub trigger: Option<TriggerKind>,

    #[arg(long, value_name = "MS", help = "Polling interval in milliseconds")]
    pub poll_interval: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
        }
    }
}

fn parse_trigger(s: &str) -> Result<TriggerKind, String> {
    s.parse::<TriggerKind>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_build_args() {
        let args = CliArgs::parse_from(["devloop", "build", "--image", "app"]);
        match args.command {
            Commands::Build(build_args) => {
                let a = build_args.artifacts;
                assert_eq!(a.image, Some("app".to_string()));
                assert_eq!(a.context, PathBuf::from("."));
                assert_eq!(a.dockerfile, "Dockerfile");
                assert_eq!(a.tag, "$IMAGE_NAME:latest");
                assert!(a.cache_from.is_empty());
                assert!(!a.push);
                assert_eq!(build_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_build_with_options() {
        let args = CliArgs::parse_from([
            "devloop",
            "build",
            "--image",
            "gcr.io/test/image",
            "--context",
            "app",
            "--cache-from",
            "pull1",
            "--cache-from",
            "pull2",
            "--watch",
            "../proto/*.proto",
            "--tag",
            "${IMAGE_NAME}:v1",
            "--push",
            "--format",
            "yaml",
        ]);

        match args.command {
            Commands::Build(build_args) => {
                let a = build_args.artifacts;
                assert_eq!(a.context, PathBuf::from("app"));
                assert_eq!(a.cache_from, vec!["pull1", "pull2"]);
                assert_eq!(a.watch, vec!["../proto/*.proto"]);
                assert_eq!(a.tag, "${IMAGE_NAME}:v1");
                assert!(a.push);
                assert_eq!(build_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_artifacts_conflicts_with_image() {
        let result = CliArgs::try_parse_from([
            "devloop",
            "build",
            "--image",
            "app",
            "--artifacts",
            "devloop.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dev_command() {
        let args = CliArgs::parse_from([
            "devloop",
            "dev",
            "--artifacts",
            "https://example.com/devloop.yaml",
            "--trigger",
            "notify",
            "--poll-interval",
            "200",
        ]);
        match args.command {
            Commands::Dev(dev_args) => {
                assert_eq!(
                    dev_args.artifacts.artifacts.as_deref(),
                    Some("https://example.com/devloop.yaml")
                );
                assert_eq!(dev_args.trigger, Some(TriggerKind::Notify));
                assert_eq!(dev_args.poll_interval, Some(200));
            }
            _ => panic!("Expected Dev command"),
        }
    }

    #[test]
    fn test_invalid_trigger() {
        let result = CliArgs::try_parse_from(["devloop", "dev", "--trigger", "fsevents"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["devloop", "-v", "build", "--image", "app"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["devloop", "--log-level", "debug", "dev"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
