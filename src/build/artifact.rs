use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Artifact name to assigned output tag
pub type ImageTags = HashMap<String, String>;

/// One image a user wants built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawArtifactSpec", into = "RawArtifactSpec")]
pub struct ArtifactSpec {
    /// Registry-qualified image name, unique within a batch
    pub image_name: String,

    /// How to build it; `None` when no build method was declared
    pub artifact_type: Option<ArtifactType>,
}

impl ArtifactSpec {
    pub fn docker(image_name: impl Into<String>, artifact: DockerArtifact) -> Self {
        Self {
            image_name: image_name.into(),
            artifact_type: Some(ArtifactType::Docker(artifact)),
        }
    }
}

/// Wire form: one optional key per build method
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifactSpec {
    image_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    docker: Option<DockerArtifact>,
}

impl From<RawArtifactSpec> for ArtifactSpec {
    fn from(raw: RawArtifactSpec) -> Self {
        Self {
            image_name: raw.image_name,
            artifact_type: raw.docker.map(ArtifactType::Docker),
        }
    }
}

impl From<ArtifactSpec> for RawArtifactSpec {
    fn from(artifact: ArtifactSpec) -> Self {
        let docker = match artifact.artifact_type {
            Some(ArtifactType::Docker(docker)) => Some(docker),
            None => None,
        };
        Self {
            image_name: artifact.image_name,
            docker,
        }
    }
}

/// Build methods, exactly one per artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactType {
    Docker(DockerArtifact),
}

/// A Dockerfile build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DockerArtifact {
    pub context: PathBuf,
    pub dockerfile: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
    /// Published images whose layers may be reused by this build
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cache_from: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Extra glob patterns, relative to the context, that also trigger rebuilds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub watch: Vec<String>,
}

impl Default for DockerArtifact {
    fn default() -> Self {
        Self {
            context: PathBuf::from("."),
            dockerfile: "Dockerfile".to_string(),
            build_args: BTreeMap::new(),
            cache_from: Vec::new(),
            target: None,
            watch: Vec::new(),
        }
    }
}

impl DockerArtifact {
    pub fn with_context(mut self, context: impl Into<PathBuf>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_cache_from<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_from = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_watch<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// A built image: artifact name and the reference later stages must deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub image_name: String,
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_docker_artifact() {
        let yaml = r#"
- imageName: gcr.io/test/image
  docker:
    context: app
    cacheFrom: [pull1, pull2]
    buildArgs:
      VERSION: "1.0"
"#;
        let artifacts: Vec<ArtifactSpec> = serde_yaml::from_str(yaml).unwrap();

        let expected = ArtifactSpec::docker(
            "gcr.io/test/image",
            DockerArtifact {
                build_args: BTreeMap::from([("VERSION".to_string(), "1.0".to_string())]),
                ..DockerArtifact::default()
                    .with_context("app")
                    .with_cache_from(["pull1", "pull2"])
            },
        );
        assert_eq!(artifacts, vec![expected]);
    }

    #[test]
    fn test_parse_artifact_without_build_method() {
        let artifacts: Vec<ArtifactSpec> =
            serde_yaml::from_str("- imageName: gcr.io/test/image\n").unwrap();

        assert_eq!(artifacts[0].image_name, "gcr.io/test/image");
        assert_eq!(artifacts[0].artifact_type, None);
    }

    #[test]
    fn test_ill_typed_docker_block_is_an_error() {
        let result: Result<Vec<ArtifactSpec>, _> =
            serde_yaml::from_str("- imageName: app\n  docker:\n    cacheFrom: 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_docker_field_is_an_error() {
        let result: Result<Vec<ArtifactSpec>, _> =
            serde_yaml::from_str("- imageName: app\n  docker:\n    cachFrom: [base]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_artifact_serializes_docker_key() {
        let artifact = ArtifactSpec::docker(
            "app",
            DockerArtifact {
                watch: vec!["../shared/**".to_string()],
                ..DockerArtifact::default()
            },
        );
        let json = serde_json::to_value(&artifact).unwrap();

        assert_eq!(json["imageName"], "app");
        assert_eq!(json["docker"]["dockerfile"], "Dockerfile");
        assert_eq!(json["docker"]["watch"][0], "../shared/**");
    }

    #[test]
    fn test_docker_defaults() {
        let artifact: DockerArtifact = serde_json::from_str("{}").unwrap();
        assert_eq!(artifact.context, PathBuf::from("."));
        assert_eq!(artifact.dockerfile, "Dockerfile");
        assert!(artifact.cache_from.is_empty());
    }

    #[test]
    fn test_serialize_result() {
        let result = BuildResult {
            image_name: "gcr.io/test/image".to_string(),
            tag: "gcr.io/test/image:1".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["imageName"], "gcr.io/test/image");
        assert_eq!(json["tag"], "gcr.io/test/image:1");
    }
}
