use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::DEFAULT_CLUSTERING_SEED;
use crate::models::Branding;

const APP_DIR: &str = "creport";

/// Service-wide settings, loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory holding report artifacts and clustering images
    pub output_dir: PathBuf,

    /// Directory of `{name}.html` templates and `styles/report.css`
    pub template_dir: Option<PathBuf>,

    /// Seed for k-means initialization
    pub clustering_seed: u64,

    /// Fail generation on template errors instead of using the built-in layout
    pub strict_templates: bool,

    /// Branding applied before per-report overrides
    pub branding: Branding,
}

impl Default for ReportSettings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            output_dir: data_dir.join("reports"),
            template_dir: Some(data_dir.join("templates")),
            clustering_seed: DEFAULT_CLUSTERING_SEED,
            strict_templates: false,
            branding: Branding::default(),
        }
    }
}

impl ReportSettings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("settings.toml"))
    }

    /// Load settings; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Load from an explicit path, or the default location when there is one
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))
    }

    /// Default stylesheet location inside the template directory
    pub fn default_stylesheet(&self) -> Option<PathBuf> {
        self.template_dir
            .as_ref()
            .map(|dir| dir.join("styles").join("report.css"))
    }
}
