//! Path and text helpers shared by dependency providers

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expands glob patterns relative to `root` into absolute file paths
///
/// A pattern matching a directory yields every file below it. Results keep
/// pattern order and are deduplicated.
pub fn expand_paths_glob(root: &Path, patterns: &[impl AsRef<str>]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let full = root.join(pattern);
        let full = full
            .to_str()
            .ok_or_else(|| anyhow!("non UTF-8 path: {}", full.display()))?;

        let matches =
            glob::glob(full).with_context(|| format!("parsing glob pattern {}", pattern))?;

        for entry in matches {
            let path = entry.context("reading glob match")?;
            let path = std::path::absolute(&path).unwrap_or(path);

            if path.is_dir() {
                for file in WalkDir::new(&path).sort_by_file_name() {
                    let file = file.with_context(|| format!("walking {}", path.display()))?;
                    if file.file_type().is_file() {
                        expanded.push(file.into_path());
                    }
                }
            } else {
                expanded.push(path);
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    expanded.retain(|p| seen.insert(p.clone()));
    Ok(expanded)
}

/// Resolves `name` against `root`, requiring an existing regular file
pub fn abs_file(root: &Path, name: &str) -> Result<PathBuf> {
    let path = std::path::absolute(root.join(name))
        .with_context(|| format!("resolving {}", name))?;

    let metadata =
        std::fs::metadata(&path).with_context(|| format!("reading {}", path.display()))?;
    if metadata.is_dir() {
        bail!("{} is a directory", path.display());
    }
    Ok(path)
}

/// Splits text into lines, dropping empty ones and trailing `\r`
pub fn non_empty_lines(input: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(input)
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a directory name is hidden; `.` itself is not
pub fn is_hidden_dir(name: &str) -> bool {
    name != "." && name != ".." && name.starts_with('.')
}

pub fn is_hidden_file(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yare::parameterized;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in ["dir/sub_dir/file", "dir_b/sub_dir_b/file"] {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    #[test]
    fn test_expand_exact_filename() {
        let dir = fixture();
        let actual = expand_paths_glob(dir.path(), &["dir/sub_dir/file"]).unwrap();
        assert_eq!(actual, vec![dir.path().join("dir/sub_dir/file")]);
    }

    #[test]
    fn test_expand_leaf_directory_glob() {
        let dir = fixture();
        let actual = expand_paths_glob(dir.path(), &["dir/sub_dir/*"]).unwrap();
        assert_eq!(actual, vec![dir.path().join("dir/sub_dir/file")]);
    }

    #[test]
    fn test_expand_top_level_glob() {
        let dir = fixture();
        let actual = expand_paths_glob(dir.path(), &["dir*"]).unwrap();
        assert_eq!(
            actual,
            vec![
                dir.path().join("dir/sub_dir/file"),
                dir.path().join("dir_b/sub_dir_b/file"),
            ]
        );
    }

    #[test]
    fn test_expand_invalid_pattern() {
        let dir = fixture();
        assert!(expand_paths_glob(dir.path(), &["[]"]).is_err());
    }

    #[test]
    fn test_abs_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file"), "").unwrap();

        let file = abs_file(dir.path(), "file").unwrap();
        assert_eq!(file, dir.path().join("file"));

        let err = abs_file(dir.path(), "").unwrap_err();
        assert!(err.to_string().ends_with("is a directory"));

        assert!(abs_file(dir.path(), "does-not-exist").is_err());
    }

    #[parameterized(
        empty = { "", &[] },
        single = { "a\n", &["a"] },
        crlf = { "a\r\n", &["a"] },
        no_trailing_newline = { "a\r\nb", &["a", "b"] },
        trailing_blank_lines = { "a\r\nb\n\n", &["a", "b"] },
        surrounding_blank_lines = { "\na\r\n\n\n", &["a"] },
    )]
    fn test_non_empty_lines(input: &str, expected: &[&str]) {
        assert_eq!(non_empty_lines(input.as_bytes()), expected);
    }

    #[test]
    fn test_hidden_names() {
        assert!(is_hidden_dir(".git"));
        assert!(!is_hidden_dir("src"));
        assert!(!is_hidden_dir("."));
        assert!(is_hidden_file(".hidden"));
        assert!(!is_hidden_file("not_hidden"));
    }
}
