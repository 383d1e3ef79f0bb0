use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Formats accepted for input documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl InputFormat {
    /// Pick a format from the file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => InputFormat::Yaml,
            _ => InputFormat::Json,
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, content: &str, path: &Path) -> Result<T> {
        match self {
            InputFormat::Json => serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON document: {}", path.display())),
            InputFormat::Yaml => serde_yaml::from_str(content)
                .with_context(|| format!("Failed to parse YAML document: {}", path.display())),
        }
    }
}

/// Read and deserialize a JSON or YAML document
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    InputFormat::from_path(path).parse(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportConfig, ReportFormat};
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.yaml")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.YML")), InputFormat::Yaml);
        assert_eq!(InputFormat::from_path(Path::new("a.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("noext")), InputFormat::Json);
    }

    #[test]
    fn test_load_yaml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "report_format: html\ninclude_clustering: false\npage_size: Letter\n").unwrap();

        let config: ReportConfig = load_document(&path).unwrap();
        assert_eq!(config.format, ReportFormat::Html);
        assert!(!config.include_clustering);
        assert!(config.include_logo);
    }

    #[test]
    fn test_load_rejects_bad_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"format": "docx"}"#).unwrap();

        let err = load_document::<ReportConfig>(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("docx"));
    }
}
