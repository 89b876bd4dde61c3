use super::ImageEngine;
use crate::build::DockerArtifact;
use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

/// In-memory [`ImageEngine`]
///
/// Each operation can be switched to fail. Pulls, pushes, tags and builds are
/// recorded so callers can check which side effects happened.
#[derive(Default)]
pub struct FakeImageEngine {
    err_image_build: bool,
    err_image_inspect: bool,
    err_image_pull: bool,
    err_image_push: bool,
    err_image_tag: bool,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    tag_to_image_id: HashMap<String, String>,
    next_id: u64,
    built: Vec<String>,
    pulled: Vec<String>,
    pushed: Vec<String>,
    tagged: Vec<(String, String)>,
}

impl FakeImageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `reference` resolve to `image_id`; an empty ID means absent
    pub fn with_image(self, reference: impl Into<String>, image_id: impl Into<String>) -> Self {
        self.lock()
            .tag_to_image_id
            .insert(reference.into(), image_id.into());
        self
    }

    pub fn failing_build(mut self) -> Self {
        self.err_image_build = true;
        self
    }

    pub fn failing_inspect(mut self) -> Self {
        self.err_image_inspect = true;
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.err_image_pull = true;
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.err_image_push = true;
        self
    }

    pub fn failing_tag(mut self) -> Self {
        self.err_image_tag = true;
        self
    }

    pub fn built(&self) -> Vec<String> {
        self.lock().built.clone()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.lock().pulled.clone()
    }

    /// Digests returned by successful pushes
    pub fn pushed(&self) -> Vec<String> {
        self.lock().pushed.clone()
    }

    /// `(image, new_tag)` pairs
    pub fn tagged(&self) -> Vec<(String, String)> {
        self.lock().tagged.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ImageEngine for FakeImageEngine {
    async fn image_id(&self, reference: &str) -> Result<Option<String>> {
        if self.err_image_inspect {
            bail!("simulated inspect failure for {}", reference);
        }

        Ok(self
            .lock()
            .tag_to_image_id
            .get(reference)
            .filter(|id| !id.is_empty())
            .cloned())
    }

    async fn pull(&self, reference: &str) -> Result<()> {
        if self.err_image_pull {
            bail!("simulated pull failure for {}", reference);
        }

        let mut state = self.lock();
        state.pulled.push(reference.to_string());
        let id = format!("pulled-{}", state.pulled.len());
        state.tag_to_image_id.insert(reference.to_string(), id);
        Ok(())
    }

    async fn build(
        &self,
        out: &mut (dyn Write + Send),
        _artifact: &DockerArtifact,
        tag: &str,
    ) -> Result<String> {
        if self.err_image_build {
            bail!("simulated build failure for {}", tag);
        }

        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            let id = format!("sha256:{:064x}", state.next_id);
            state.built.push(tag.to_string());
            state.tag_to_image_id.insert(tag.to_string(), id.clone());
            state.tag_to_image_id.insert(id.clone(), id.clone());
            id
        };

        writeln!(out, "Successfully built {}", id)?;
        Ok(id)
    }

    async fn push(&self, local_ref: &str, tag: &str) -> Result<String> {
        if self.err_image_push {
            bail!("simulated push failure for {}", tag);
        }

        let digest = format!("sha256:{}", hex::encode(Sha256::digest(local_ref.as_bytes())));
        self.lock().pushed.push(digest.clone());
        Ok(digest)
    }

    async fn tag(&self, image: &str, new_tag: &str) -> Result<()> {
        if self.err_image_tag {
            bail!("simulated tag failure for {}", new_tag);
        }

        let mut state = self.lock();
        state
            .tag_to_image_id
            .insert(new_tag.to_string(), image.to_string());
        state.tagged.push((image.to_string(), new_tag.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_image_id_lookup() {
        let engine = FakeImageEngine::new()
            .with_image("present", "id1")
            .with_image("empty", "");

        assert_eq!(engine.image_id("present").await.unwrap().as_deref(), Some("id1"));
        assert_eq!(engine.image_id("empty").await.unwrap(), None);
        assert_eq!(engine.image_id("unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pull_makes_image_present() {
        let engine = FakeImageEngine::new();
        engine.pull("busybox").await.unwrap();

        assert!(engine.image_id("busybox").await.unwrap().is_some());
        assert_eq!(engine.pulled(), vec!["busybox".to_string()]);
    }

    #[tokio::test]
    async fn test_push_digest_is_stable() {
        let engine = FakeImageEngine::new();
        let first = engine.push("id", "app:tag").await.unwrap();
        let second = engine.push("id", "app:tag").await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("sha256:"));
        assert_eq!(engine.pushed().len(), 2);
    }
}
