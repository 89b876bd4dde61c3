use thiserror::Error;

/// Failure of one artifact, which fails the whole batch
#[derive(Debug, Error)]
pub enum BuildError {
    /// The artifact declares no build method this builder supports
    #[error("unknown artifact type for {image}")]
    UnknownArtifactType { image: String },

    #[error("building {image}: {source:#}")]
    ImageBuild {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("getting image ID for {image}: {source:#}")]
    ImageId {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("built image {image} is missing from the local store")]
    ImageNotFound { image: String },

    #[error("tagging {image}: {source:#}")]
    Tag {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("pushing {image}: {source:#}")]
    Push {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid digest returned for {image}: {source:#}")]
    InvalidDigest {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("writing build output: {0}")]
    Output(#[from] std::io::Error),
}

impl BuildError {
    /// Image name of the failing artifact, when known
    pub fn image(&self) -> Option<&str> {
        match self {
            BuildError::UnknownArtifactType { image }
            | BuildError::ImageBuild { image, .. }
            | BuildError::ImageId { image, .. }
            | BuildError::ImageNotFound { image }
            | BuildError::Tag { image, .. }
            | BuildError::Push { image, .. }
            | BuildError::InvalidDigest { image, .. } => Some(image),
            BuildError::Output(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn source() -> anyhow::Error {
        anyhow::anyhow!("daemon said no")
    }

    #[parameterized(
        unknown = { BuildError::UnknownArtifactType { image: "app".into() }, "unknown artifact type for app" },
        build = { BuildError::ImageBuild { image: "app".into(), source: source() }, "building app: daemon said no" },
        image_id = { BuildError::ImageId { image: "app".into(), source: source() }, "getting image ID for app: daemon said no" },
        not_found = { BuildError::ImageNotFound { image: "app".into() }, "built image app is missing from the local store" },
        tag = { BuildError::Tag { image: "app".into(), source: source() }, "tagging app: daemon said no" },
        push = { BuildError::Push { image: "app".into(), source: source() }, "pushing app: daemon said no" },
        digest = { BuildError::InvalidDigest { image: "app".into(), source: source() }, "invalid digest returned for app: daemon said no" },
    )]
    fn test_artifact_errors_name_the_image(err: BuildError, message: &str) {
        assert_eq!(err.to_string(), message);
        assert_eq!(err.image(), Some("app"));
    }

    #[test]
    fn test_output_error_has_no_image() {
        let err = BuildError::from(std::io::Error::other("closed"));
        assert_eq!(err.image(), None);
        assert_eq!(err.to_string(), "writing build output: closed");
    }
}
