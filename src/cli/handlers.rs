use super::commands::{ArtifactArgs, BuildArgs, DevArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::build::{ArtifactSpec, ArtifactType, BuildResult, DockerArtifact, ImageTags, LocalBuilder};
use crate::config::{DevloopConfig, TriggerKind};
use crate::dev::DevLoop;
use crate::docker::{DockerDaemon, ImageEngine};
use crate::util::{expand, read_configuration};
use crate::watch::{NotifyTrigger, PollTrigger, Trigger};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub async fn handle_build(args: &BuildArgs) -> i32 {
    match run_build(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Build failed: {:#}", e);
            1
        }
    }
}

pub async fn handle_dev(args: &DevArgs) -> i32 {
    match run_dev(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Dev loop failed: {:#}", e);
            1
        }
    }
}

async fn run_build(args: &BuildArgs) -> Result<()> {
    let config = resolve_config(&args.artifacts, None, None)?;
    let artifacts = load_artifacts(&args.artifacts).await?;
    let tags = assign_tags(&args.artifacts.tag, &artifacts);

    let engine = connect().await?;
    let results = build_once(engine, config.push, &tags, &artifacts).await?;

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    println!("{}", formatter.format(&results)?);
    Ok(())
}

/// Builds a batch with build output on stderr, keeping stdout for results
pub async fn build_once(
    engine: Arc<dyn ImageEngine>,
    push: bool,
    tags: &ImageTags,
    artifacts: &[ArtifactSpec],
) -> Result<Vec<BuildResult>> {
    let builder = LocalBuilder::new(engine, push);
    let mut out = std::io::stderr();
    let results = builder.build(&mut out, tags, artifacts).await?;
    Ok(results)
}

async fn run_dev(args: &DevArgs) -> Result<()> {
    let config = resolve_config(&args.artifacts, args.trigger, args.poll_interval)?;
    let artifacts = load_artifacts(&args.artifacts).await?;
    let tags = assign_tags(&args.artifacts.tag, &artifacts);

    let engine = connect().await?;
    let builder = Arc::new(LocalBuilder::new(engine, config.push));
    let mut trigger = make_trigger(&config, &artifacts)?;

    let stop = CancellationToken::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping");
                stop.cancel();
            }
        }
    });

    let (tx, mut rx) = mpsc::channel::<Vec<BuildResult>>(16);
    let printer = tokio::spawn(async move {
        while let Some(results) = rx.recv().await {
            for result in &results {
                println!("{}", OutputFormatter::format_line(result));
            }
        }
    });

    let dev = DevLoop::new(builder, tags, artifacts, tx);
    let outcome = dev.run(trigger.as_mut(), stop).await;
    drop(dev);
    let _ = printer.await;
    outcome
}

async fn connect() -> Result<Arc<dyn ImageEngine>> {
    let daemon = DockerDaemon::connect()
        .await
        .context("Failed to connect to the Docker daemon")?;
    Ok(Arc::new(daemon))
}

/// Environment configuration with command-line overrides applied
pub fn resolve_config(
    args: &ArtifactArgs,
    trigger: Option<TriggerKind>,
    poll_interval_ms: Option<u64>,
) -> Result<DevloopConfig> {
    let mut config = DevloopConfig::default();
    if args.push {
        config.push = true;
    }
    if let Some(trigger) = trigger {
        config.trigger = trigger;
    }
    if let Some(ms) = poll_interval_ms {
        config.poll_interval_ms = ms;
    }

    config.validate()?;
    debug!("{}", config);
    Ok(config)
}

/// Artifacts from `--artifacts`, or a single Docker artifact from `--image`
pub async fn load_artifacts(args: &ArtifactArgs) -> Result<Vec<ArtifactSpec>> {
    if let Some(source) = &args.artifacts {
        let bytes = read_configuration(source)
            .await
            .with_context(|| format!("Failed to read artifacts from {}", source))?;
        let artifacts: Vec<ArtifactSpec> = serde_yaml::from_slice(&bytes)
            .with_context(|| format!("Failed to parse artifacts from {}", source))?;
        if artifacts.is_empty() {
            bail!("{} declares no artifacts", source);
        }
        return Ok(artifacts);
    }

    let Some(image) = &args.image else {
        bail!("Either --image or --artifacts is required");
    };

    let docker = DockerArtifact {
        dockerfile: args.dockerfile.clone(),
        ..DockerArtifact::default()
            .with_context(args.context.clone())
            .with_cache_from(args.cache_from.iter().cloned())
            .with_watch(args.watch.iter().cloned())
    };
    Ok(vec![ArtifactSpec::docker(image.clone(), docker)])
}

/// Expands the tag template for every artifact
pub fn assign_tags(template: &str, artifacts: &[ArtifactSpec]) -> ImageTags {
    artifacts
        .iter()
        .map(|a| {
            (
                a.image_name.clone(),
                expand(template, "IMAGE_NAME", &a.image_name),
            )
        })
        .collect()
}

fn make_trigger(config: &DevloopConfig, artifacts: &[ArtifactSpec]) -> Result<Box<dyn Trigger>> {
    match config.trigger {
        TriggerKind::Polling => Ok(Box::new(PollTrigger::new(config.poll_interval()))),
        TriggerKind::Notify => {
            let trigger = NotifyTrigger::new(notify_roots(artifacts), config.poll_interval())
                .context("Failed to start file notifications")?;
            Ok(Box::new(trigger))
        }
    }
}

/// Directories to watch for notifications: each context plus the fixed
/// prefix of every extra watch pattern
pub fn notify_roots(artifacts: &[ArtifactSpec]) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for artifact in artifacts {
        let Some(ArtifactType::Docker(docker)) = &artifact.artifact_type else {
            continue;
        };
        roots.push(docker.context.clone());
        for pattern in &docker.watch {
            let base = glob_base(&docker.context.join(pattern));
            let (Ok(base), Ok(context)) = (base.canonicalize(), docker.context.canonicalize())
            else {
                continue;
            };
            if !base.starts_with(&context) {
                roots.push(base);
            }
        }
    }
    roots.sort();
    roots.dedup();
    roots
}

fn glob_base(pattern: &Path) -> PathBuf {
    let mut base = PathBuf::new();
    for component in pattern.components() {
        let part = component.as_os_str().to_string_lossy();
        if part.contains(['*', '?', '[']) {
            break;
        }
        base.push(component);
    }
    base
}
