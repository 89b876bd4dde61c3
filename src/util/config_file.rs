//! Reading definition files from disk or over HTTP

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReadConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ReadConfigError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadConfigError::NotFound(_))
    }
}

fn is_url(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://")
}

/// Reads a definition file
///
/// `http(s)://` locations are downloaded. A missing `name.yaml` falls back to
/// `name.yml`.
pub async fn read_configuration(name: &str) -> Result<Vec<u8>, ReadConfigError> {
    if is_url(name) {
        return download(name).await;
    }

    let path = Path::new(name);
    match read_local(path).await {
        Err(ReadConfigError::NotFound(_)) if path.extension().is_some_and(|e| e == "yaml") => {
            let fallback = path.with_extension("yml");
            debug!("{} not found, trying {}", path.display(), fallback.display());
            read_local(&fallback)
                .await
                .map_err(|e| match e {
                    ReadConfigError::NotFound(_) => ReadConfigError::NotFound(path.to_path_buf()),
                    other => other,
                })
        }
        result => result,
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, ReadConfigError> {
    tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ReadConfigError::NotFound(path.to_path_buf())
        } else {
            ReadConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

async fn download(url: &str) -> Result<Vec<u8>, ReadConfigError> {
    let http = |source| ReadConfigError::Http {
        url: url.to_string(),
        source,
    };

    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(http)?;
    let body = response.bytes().await.map_err(http)?;
    Ok(body.to_vec())
}
