use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::models::{ReportError, ReportFormat};
use crate::rendering::fallback::{self, render_fallback_html};
use crate::rendering::json::to_portable_json;
use crate::rendering::model::EnrichedModel;
use crate::rendering::pdf::{RasterError, Rasterizer};
use crate::rendering::templates::{TemplateEngine, TemplateError};

/// Characters of HTML assumed to fill one PDF page
pub const CHARS_PER_PAGE_ESTIMATE: usize = 5000;

/// Rough page count for a rendered HTML document
pub fn estimate_page_count(content_length: usize) -> u32 {
    (content_length / CHARS_PER_PAGE_ESTIMATE).max(1) as u32
}

/// Bytes produced for one report
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub page_count: Option<u32>,
    /// True when the built-in layout replaced the requested template
    pub used_fallback: bool,
}

/// Renders an enriched model into the configured output format
pub struct RenderPipeline {
    templates: Box<dyn TemplateEngine>,
    rasterizer: Box<dyn Rasterizer>,
    default_stylesheet: Option<PathBuf>,
    strict_templates: bool,
}

impl RenderPipeline {
    pub fn new(templates: Box<dyn TemplateEngine>, rasterizer: Box<dyn Rasterizer>) -> Self {
        Self {
            templates,
            rasterizer,
            default_stylesheet: None,
            strict_templates: false,
        }
    }

    /// Stylesheet applied before custom CSS when rasterizing
    pub fn with_default_stylesheet(mut self, path: Option<PathBuf>) -> Self {
        self.default_stylesheet = path;
        self
    }

    /// Surface template failures instead of falling back
    pub fn with_strict_templates(mut self, strict: bool) -> Self {
        self.strict_templates = strict;
        self
    }

    pub fn rasterizer_name(&self) -> &str {
        self.rasterizer.name()
    }

    /// Fail early when the format cannot be produced with the configured backends
    pub fn ensure_supported(&self, format: ReportFormat) -> Result<(), ReportError> {
        if format == ReportFormat::Pdf && !self.rasterizer.is_available() {
            return Err(ReportError::RenderBackendUnavailable {
                reason: format!("rasterizer '{}' cannot produce PDF output", self.rasterizer.name()),
            });
        }
        Ok(())
    }

    pub fn render(&self, model: &EnrichedModel) -> Result<RenderedArtifact, ReportError> {
        match model.config.format {
            ReportFormat::Json => {
                let json = to_portable_json(model).map_err(|e| ReportError::Render {
                    reason: format!("JSON serialization failed: {}", e),
                })?;
                Ok(RenderedArtifact {
                    bytes: json.into_bytes(),
                    page_count: None,
                    used_fallback: false,
                })
            }
            ReportFormat::Html => {
                let (html, used_fallback) = self.render_html(model)?;
                Ok(RenderedArtifact {
                    bytes: html.into_bytes(),
                    page_count: None,
                    used_fallback,
                })
            }
            ReportFormat::Pdf => {
                self.ensure_supported(ReportFormat::Pdf)?;
                let (html, used_fallback) = self.render_html(model)?;
                let stylesheets = self.stylesheets(model);

                let bytes = self
                    .rasterizer
                    .rasterize(&html, &stylesheets, model.config.page_layout())
                    .map_err(|e| match e {
                        RasterError::Unavailable { reason } => ReportError::RenderBackendUnavailable { reason },
                        RasterError::Render { reason } => ReportError::Render { reason },
                    })?;

                Ok(RenderedArtifact {
                    bytes,
                    page_count: Some(estimate_page_count(html.len())),
                    used_fallback,
                })
            }
        }
    }

    /// Render the HTML body from the named template, or the built-in layout
    pub fn render_html(&self, model: &EnrichedModel) -> Result<(String, bool), ReportError> {
        let name = &model.config.template_name;
        match self.templates.render(name, &template_context(model)) {
            Ok(html) => {
                debug!(template = %name, "Rendered report template");
                Ok((html, false))
            }
            Err(e) if self.strict_templates => Err(ReportError::Template {
                template: name.clone(),
                reason: e.to_string(),
            }),
            Err(TemplateError::NotFound { .. }) => {
                info!(template = %name, "Template not found, using built-in layout");
                Ok((render_fallback_html(model), true))
            }
            Err(e) => {
                warn!(template = %name, error = %e, "Template failed, using built-in layout");
                Ok((render_fallback_html(model), true))
            }
        }
    }

    fn stylesheets(&self, model: &EnrichedModel) -> Vec<String> {
        let mut sheets = Vec::new();
        if let Some(path) = self.default_stylesheet.as_ref().filter(|p| p.is_file()) {
            match fs::read_to_string(path) {
                Ok(css) => sheets.push(css),
                Err(e) => warn!(path = %path.display(), error = %e, "Default stylesheet could not be read"),
            }
        }
        if let Some(custom) = &model.config.custom_css {
            sheets.push(custom.clone());
        }
        sheets
    }
}

/// JSON context for templates: the model plus pre-rendered HTML fragments
pub fn template_context(model: &EnrichedModel) -> Value {
    let mut context = serde_json::to_value(model).unwrap_or_else(|e| {
        warn!(error = %e, "Report model could not be converted for templates");
        Value::Null
    });
    if let Value::Object(map) = &mut context {
        map.insert(
            "fragments".to_string(),
            json!({
                "styles": fallback::stylesheet(model),
                "summary": fallback::summary_cards(model),
                "clustering": fallback::clustering_section(model),
                "results": fallback::results_section(model),
                "custom_sections": fallback::custom_sections(model),
            }),
        );
    }
    context
}
