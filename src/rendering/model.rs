//! The enriched data model handed to renderers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::analysis::{ClusteringOutcome, SummaryStats};
use crate::models::{AnalysisResult, Branding, ReportConfig, ReportData, ReportSection};

/// Everything a renderer needs, rebuilt for every generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedModel {
    pub report_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub organization: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Moment the model was assembled
    pub current_time: DateTime<Utc>,
    pub config: ReportConfig,
    pub summary: SummaryStats,
    pub clustering: Option<ClusteringOutcome>,
    pub branding: ResolvedBranding,
    pub results: Vec<ProcessedResult>,
    pub custom_sections: Vec<ReportSection>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Branding after overrides and logo loading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedBranding {
    pub company_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub font_family: String,
    pub logo_path: Option<PathBuf>,
    /// Logo as a data URI, present when the logo was requested and readable
    pub logo_data_uri: Option<String>,
}

/// Render-ready view of a single analysis result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedResult {
    /// 1-based position in the report
    pub index: usize,
    pub label: String,
    pub analysis_id: Option<String>,
    pub protocol_type: String,
    pub compliance_score: f64,
    pub confidence_score: f64,
    pub compliance_status: String,
    /// CSS-friendly status bucket
    pub status_class: String,
    pub issue_count: usize,
    pub recommendation_count: usize,
    pub processing_time: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub similar_sections: Vec<String>,
}

/// Bucket a free-form compliance status for styling
pub fn status_class(status: &str) -> &'static str {
    let status = status.to_ascii_lowercase();
    if status.contains("non") {
        "non-compliant"
    } else if status.contains("partial") {
        "partial"
    } else if status.contains("compliant") {
        "compliant"
    } else {
        "unknown"
    }
}

impl ProcessedResult {
    pub fn from_result(result: &AnalysisResult, position: usize, detailed: bool) -> Self {
        let status = result.compliance_status().to_string();
        let (issues, recommendations, similar_sections) = if detailed {
            (
                result.issues().iter().map(|i| i.text()).collect(),
                result.recommendations().iter().map(|r| r.text()).collect(),
                result.similar_sections.iter().map(|s| s.display()).collect(),
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        Self {
            index: position,
            label: result.label(position),
            analysis_id: result.analysis_id.clone(),
            protocol_type: result.protocol_type.clone().unwrap_or_else(|| "unknown".to_string()),
            compliance_score: result.compliance_score().unwrap_or(0.0),
            confidence_score: result.confidence_score().unwrap_or(0.0),
            status_class: status_class(&status).to_string(),
            compliance_status: status,
            issue_count: result.issues().len(),
            recommendation_count: result.recommendations().len(),
            processing_time: result.processing_time.unwrap_or(0.0),
            issues,
            recommendations,
            similar_sections,
        }
    }
}

/// Merge default branding with report overrides and load the logo if wanted
pub fn resolve_branding(defaults: &Branding, config: &ReportConfig) -> ResolvedBranding {
    let mut branding = defaults.clone();
    if let Some(overrides) = &config.custom_branding {
        let unknown = branding.apply_overrides(overrides);
        if !unknown.is_empty() {
            debug!(keys = ?unknown, "Ignoring unknown branding overrides");
        }
    }

    let logo_data_uri = match (&branding.logo_path, config.include_logo) {
        (Some(path), true) => load_logo(path),
        _ => None,
    };

    ResolvedBranding {
        company_name: branding.company_name,
        primary_color: branding.primary_color,
        secondary_color: branding.secondary_color,
        accent_color: branding.accent_color,
        font_family: branding.font_family,
        logo_path: branding.logo_path,
        logo_data_uri,
    }
}

/// Read an image file into a base64 data URI
pub fn image_data_uri(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let mime = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "svg" => "image/svg+xml",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "image/png",
    };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn load_logo(path: &Path) -> Option<String> {
    match image_data_uri(path) {
        Ok(uri) => Some(uri),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Logo could not be loaded");
            None
        }
    }
}

impl EnrichedModel {
    /// Assemble the model from caller data and computed enrichments
    pub fn build(
        report_id: &str,
        data: &ReportData,
        config: &ReportConfig,
        summary: SummaryStats,
        clustering: Option<ClusteringOutcome>,
        branding: ResolvedBranding,
    ) -> Self {
        let now = Utc::now();
        let results = data
            .analysis_results
            .iter()
            .enumerate()
            .map(|(i, r)| ProcessedResult::from_result(r, i + 1, config.include_detailed_analysis))
            .collect();

        Self {
            report_id: report_id.to_string(),
            title: data.title.clone(),
            subtitle: data.subtitle.clone(),
            author: data.author.clone(),
            organization: data.organization.clone(),
            generated_at: data.generated_at.unwrap_or(now),
            current_time: now,
            config: config.clone(),
            summary,
            clustering,
            branding,
            results,
            custom_sections: data.custom_sections.clone(),
            metadata: data.metadata.clone().unwrap_or_default(),
        }
    }

    /// Path of the clustering image, if one was rendered
    pub fn plot_path(&self) -> Option<&Path> {
        self.clustering
            .as_ref()
            .and_then(|c| c.payload())
            .and_then(|p| p.plot_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceAssessment, Finding, SimilarSection};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_result() -> AnalysisResult {
        AnalysisResult {
            analysis_id: Some("a-1".to_string()),
            protocol_title: None,
            similar_sections: vec![SimilarSection {
                section_title: Some("Dosage".to_string()),
                ..Default::default()
            }],
            compliance: Some(ComplianceAssessment {
                compliance_score: Some(0.55),
                compliance_status: Some("Partially_Compliant".to_string()),
                issues: vec![Finding::Text("Missing AE reporting".to_string())],
                recommendations: vec![Finding::Text("Add AE section".to_string())],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class("compliant"), "compliant");
        assert_eq!(status_class("NON_COMPLIANT"), "non-compliant");
        assert_eq!(status_class("partially_compliant"), "partial");
        assert_eq!(status_class("unknown"), "unknown");
        assert_eq!(status_class("pending"), "unknown");
    }

    #[test]
    fn test_processed_result_detail_toggle() {
        let detailed = ProcessedResult::from_result(&create_test_result(), 2, true);
        assert_eq!(detailed.label, "Protocol 2");
        assert_eq!(detailed.status_class, "partial");
        assert_eq!(detailed.protocol_type, "unknown");
        assert_eq!(detailed.issues, vec!["Missing AE reporting".to_string()]);
        assert_eq!(detailed.similar_sections, vec!["Dosage".to_string()]);

        let brief = ProcessedResult::from_result(&create_test_result(), 2, false);
        assert!(brief.issues.is_empty());
        assert!(brief.recommendations.is_empty());
        assert_eq!(brief.issue_count, 1);
        assert_eq!(brief.recommendation_count, 1);
    }

    #[test]
    fn test_resolve_branding_with_logo() {
        let temp_dir = TempDir::new().unwrap();
        let logo = temp_dir.path().join("logo.png");
        std::fs::write(&logo, [0x89, b'P', b'N', b'G']).unwrap();

        let defaults = Branding {
            logo_path: Some(logo),
            ..Branding::default()
        };
        let mut config = ReportConfig::default();
        config.custom_branding = Some(HashMap::from([(
            "company_name".to_string(),
            "Trial Ops".to_string(),
        )]));

        let resolved = resolve_branding(&defaults, &config);
        assert_eq!(resolved.company_name, "Trial Ops");
        assert!(resolved.logo_data_uri.unwrap().starts_with("data:image/png;base64,"));

        config.include_logo = false;
        assert!(resolve_branding(&defaults, &config).logo_data_uri.is_none());
    }

    #[test]
    fn test_missing_logo_is_ignored() {
        let defaults = Branding {
            logo_path: Some(PathBuf::from("/nonexistent/logo.png")),
            ..Branding::default()
        };
        let resolved = resolve_branding(&defaults, &ReportConfig::default());
        assert!(resolved.logo_data_uri.is_none());
    }

    #[test]
    fn test_build_assigns_timestamp() {
        let data = ReportData::new("Quarterly", vec![create_test_result()]);
        let config = ReportConfig::default();
        let model = EnrichedModel::build(
            "report_1",
            &data,
            &config,
            SummaryStats::default(),
            None,
            resolve_branding(&Branding::default(), &config),
        );
        assert_eq!(model.generated_at, model.current_time);
        assert_eq!(model.results.len(), 1);
        assert!(model.plot_path().is_none());
        assert!(model.metadata.is_empty());
    }
}
