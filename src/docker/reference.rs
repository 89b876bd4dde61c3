use anyhow::{bail, Context, Result};
use std::fmt;

/// Splits an image reference into repository and tag
///
/// A `:` only separates a tag when it appears after the last `/`, so registry
/// ports (`localhost:5000/app`) are kept in the repository. A trailing
/// `@digest` is discarded.
pub fn split_tag(reference: &str) -> (&str, Option<&str>) {
    let reference = reference
        .split_once('@')
        .map(|(name, _)| name)
        .unwrap_or(reference);

    let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[last_slash..].rfind(':') {
        Some(i) => {
            let at = last_slash + i;
            (&reference[..at], Some(&reference[at + 1..]))
        }
        None => (reference, None),
    }
}

/// Repository part of a reference, without tag or digest
pub fn repository(reference: &str) -> &str {
    split_tag(reference).0
}

/// Content-addressable digest such as `sha256:7368...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: String,
    hash: String,
}

impl Digest {
    /// Parses `algorithm:hash`
    pub fn parse(digest: &str) -> Result<Self> {
        let (algorithm, hash) = digest.trim().split_once(':').with_context(|| {
            format!(
                "Invalid digest format (expected 'algorithm:hash'): {}",
                digest
            )
        })?;

        if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("Invalid digest algorithm: {}", digest);
        }
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid digest hash: {}", digest);
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hash: hash.to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Pins `tag` to this digest: `name:tag@algorithm:hash`
    pub fn pin(&self, tag: &str) -> String {
        format!("{}@{}", tag, self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hash)
    }
}
