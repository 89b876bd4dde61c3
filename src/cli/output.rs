//! Output formatting for build results

use crate::build::BuildResult;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly)
    Yaml,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, results: &[BuildResult]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(results).context("Failed to serialize results to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(results).context("Failed to serialize results to YAML")
            }
        }
    }

    /// One line per result, used while watching
    pub fn format_line(result: &BuildResult) -> String {
        format!("{} -> {}", result.image_name, result.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<BuildResult> {
        vec![BuildResult {
            image_name: "gcr.io/test/image".to_string(),
            tag: "gcr.io/test/image:1".to_string(),
        }]
    }

    #[test]
    fn test_format_json() {
        let output = OutputFormatter::new(OutputFormat::Json)
            .format(&results())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["imageName"], "gcr.io/test/image");
        assert_eq!(parsed[0]["tag"], "gcr.io/test/image:1");
    }

    #[test]
    fn test_format_yaml() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format(&results())
            .unwrap();

        assert!(output.contains("imageName: gcr.io/test/image"));
        assert!(output.contains("tag: gcr.io/test/image:1"));
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            OutputFormatter::format_line(&results()[0]),
            "gcr.io/test/image -> gcr.io/test/image:1"
        );
    }
}
