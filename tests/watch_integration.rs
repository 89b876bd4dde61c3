//! Watch loop integration tests over a real build context

use devloop::docker::context;
use devloop::watch::{ChannelTrigger, ChangeHandler, ChangeSet, PollTrigger, Watcher};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Recorder(Arc<Mutex<Vec<ChangeSet>>>);

#[async_trait::async_trait]
impl ChangeHandler for Recorder {
    async fn on_change(&mut self, changes: &ChangeSet) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(changes.clone());
        Ok(())
    }
}

fn build_context() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Dockerfile"), "FROM busybox\nCOPY . /app\n").unwrap();
    fs::write(dir.path().join(".dockerignore"), "*.log\n").unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/main.go"), "package main\n").unwrap();
    dir
}

fn watch_context(watcher: &mut Watcher, dir: &Path) -> Arc<Mutex<Vec<ChangeSet>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let root = dir.to_path_buf();
    watcher
        .register(
            "app",
            move || context::dependencies(&root, "Dockerfile"),
            Recorder(seen.clone()),
        )
        .unwrap();
    seen
}

#[tokio::test]
async fn test_changes_in_context_are_reported_once() {
    let dir = build_context();
    let mut watcher = Watcher::new();
    let seen = watch_context(&mut watcher, dir.path());

    set_file_mtime(dir.path().join("src/main.go"), FileTime::from_unix_time(1_000, 0)).unwrap();
    fs::write(dir.path().join("src/util.go"), "package main\n").unwrap();

    assert_eq!(watcher.poll().await.unwrap(), 1);
    assert_eq!(watcher.poll().await.unwrap(), 0);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let changes = &seen[0];
    assert_eq!(changes.added.len(), 1);
    assert!(changes.added[0].ends_with("src/util.go"));
    assert_eq!(changes.modified.len(), 1);
    assert!(changes.modified[0].ends_with("src/main.go"));
    assert!(changes.deleted.is_empty());
}

#[tokio::test]
async fn test_ignored_files_do_not_trigger() {
    let dir = build_context();
    let mut watcher = Watcher::new();
    let seen = watch_context(&mut watcher, dir.path());

    fs::write(dir.path().join("debug.log"), "noise\n").unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();

    assert_eq!(watcher.poll().await.unwrap(), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_file_is_reported() {
    let dir = build_context();
    let mut watcher = Watcher::new();
    let seen = watch_context(&mut watcher, dir.path());
    let main_go = dir.path().join("src/main.go");
    let expected = context::dependencies(dir.path(), "Dockerfile")
        .unwrap()
        .into_iter()
        .find(|p| p.ends_with("src/main.go"))
        .unwrap();

    fs::remove_file(&main_go).unwrap();
    watcher.poll().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].deleted, vec![expected]);
}

#[tokio::test]
async fn test_run_with_channel_trigger() {
    let dir = build_context();
    let mut watcher = Watcher::new();
    let seen = watch_context(&mut watcher, dir.path());
    let (tick, mut trigger) = ChannelTrigger::channel(4);

    fs::write(dir.path().join("README.md"), "# app\n").unwrap();
    tick.send(()).await.unwrap();
    drop(tick);

    watcher
        .run(&mut trigger, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_run_stops_when_cancelled() {
    let dir = build_context();
    let mut watcher = Watcher::new();
    let _seen = watch_context(&mut watcher, dir.path());
    let mut trigger = PollTrigger::new(Duration::from_millis(10));
    let stop = CancellationToken::new();

    let canceller = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stop.cancel();
        })
    };

    tokio::time::timeout(Duration::from_secs(5), watcher.run(&mut trigger, stop))
        .await
        .expect("watch loop did not stop")
        .unwrap();
    canceller.await.unwrap();
}
