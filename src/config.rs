use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HygieneError, Result};
use crate::pipeline::processing::cleaning::CleaningConfig;

/// Top-level pipeline configuration, loaded from `hygiene.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Where export artifacts are written.
#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the given TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HygieneError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `hygiene.toml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new("hygiene.toml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert!(config.cleaning.strip_bom);
        assert!(config.cleaning.trim_whitespace);
        assert_eq!(config.export.output_dir, "output");
    }

    #[test]
    fn partial_override() {
        let toml_src = r#"
            [cleaning]
            trim_whitespace = false
            key_fields = ["badge_no"]

            [export]
            output_dir = "artifacts"
        "#;
        let config: PipelineConfig = toml::from_str(toml_src).unwrap();
        assert!(config.cleaning.strip_bom);
        assert!(!config.cleaning.trim_whitespace);
        assert_eq!(config.cleaning.key_fields, vec!["badge_no".to_string()]);
        assert_eq!(config.export.output_dir, "artifacts");
    }
}
