//! Report configuration supplied by callers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::ReportError;

/// Output format of a generated report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReportFormat {
    Pdf,
    Html,
    Json,
}

impl ReportFormat {
    /// File extension used for artifacts of this format
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }

    /// Probe order used when resolving an id back to an artifact
    pub fn lookup_order() -> [ReportFormat; 3] {
        [ReportFormat::Pdf, ReportFormat::Html, ReportFormat::Json]
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(ReportError::UnsupportedFormat { format: other.to_string() }),
        }
    }
}

impl TryFrom<String> for ReportFormat {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportFormat> for String {
    fn from(format: ReportFormat) -> Self {
        format.extension().to_string()
    }
}

/// Page size for paginated output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
}

impl PageSize {
    /// Portrait dimensions in PostScript points
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::A3 => (842.0, 1191.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }

    pub fn css_name(&self) -> &'static str {
        match self {
            PageSize::A4 => "A4",
            PageSize::A3 => "A3",
            PageSize::Letter => "letter",
            PageSize::Legal => "legal",
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "a3" => Ok(PageSize::A3),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            other => Err(format!("Unknown page size: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!("Unknown orientation: {}", other)),
        }
    }
}

/// Page geometry handed to the rasterizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
}

/// Visual identity applied to rendered reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Branding {
    pub company_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub font_family: String,
    /// Logo image embedded when a report asks for it
    pub logo_path: Option<PathBuf>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            company_name: "Compliance Analysis".to_string(),
            primary_color: "#1f4e79".to_string(),
            secondary_color: "#2e75b6".to_string(),
            accent_color: "#f39c12".to_string(),
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            logo_path: None,
        }
    }
}

impl Branding {
    /// Apply per-report overrides; returns the keys that were not recognized
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (key, value) in overrides {
            match key.as_str() {
                "company_name" => self.company_name = value.clone(),
                "primary_color" => self.primary_color = value.clone(),
                "secondary_color" => self.secondary_color = value.clone(),
                "accent_color" => self.accent_color = value.clone(),
                "font_family" => self.font_family = value.clone(),
                "logo_path" => self.logo_path = Some(PathBuf::from(value)),
                _ => unknown.push(key.clone()),
            }
        }
        unknown.sort();
        unknown
    }
}

/// How a single report should be produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format
    #[serde(alias = "report_format")]
    pub format: ReportFormat,

    /// Template name, resolved as "{template_name}.html"
    pub template_name: String,

    /// Embed the branding logo
    pub include_logo: bool,

    /// Run clustering over the analysis results
    pub include_clustering: bool,

    /// Include per-result issue and recommendation lists
    pub include_detailed_analysis: bool,

    /// Extra CSS appended after the default stylesheet
    pub custom_css: Option<String>,

    /// Branding overrides keyed by branding field name
    pub custom_branding: Option<HashMap<String, String>>,

    pub page_size: PageSize,

    pub orientation: Orientation,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Pdf,
            template_name: "default".to_string(),
            include_logo: true,
            include_clustering: true,
            include_detailed_analysis: true,
            custom_css: None,
            custom_branding: None,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
        }
    }
}

impl ReportConfig {
    /// Create a config for the given format with default toggles
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn page_layout(&self) -> PageLayout {
        let (width, height) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => PageLayout { width, height },
            Orientation::Landscape => PageLayout {
                width: height,
                height: width,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        let err = "docx".parse::<ReportFormat>().unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_config_rejects_unknown_format() {
        let parsed: Result<ReportConfig, _> = serde_json::from_str(r#"{"format": "xlsx"}"#);
        assert!(parsed.is_err());

        let parsed: ReportConfig = serde_json::from_str(r#"{"report_format": "json"}"#).unwrap();
        assert_eq!(parsed.format, ReportFormat::Json);
        assert_eq!(parsed.template_name, "default");
        assert!(parsed.include_clustering);
    }

    #[test]
    fn test_branding_overrides() {
        let mut branding = Branding::default();
        let overrides = HashMap::from([
            ("company_name".to_string(), "Acme Trials".to_string()),
            ("primary_color".to_string(), "#000000".to_string()),
            ("mascot".to_string(), "owl".to_string()),
        ]);
        let unknown = branding.apply_overrides(&overrides);
        assert_eq!(branding.company_name, "Acme Trials");
        assert_eq!(branding.primary_color, "#000000");
        assert_eq!(branding.secondary_color, Branding::default().secondary_color);
        assert_eq!(unknown, vec!["mascot".to_string()]);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let mut config = ReportConfig::new(ReportFormat::Pdf);
        config.page_size = PageSize::Letter;
        config.orientation = Orientation::Landscape;
        let layout = config.page_layout();
        assert_eq!(layout.width, 792.0);
        assert_eq!(layout.height, 612.0);
    }
}
