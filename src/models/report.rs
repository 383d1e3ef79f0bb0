//! Report inputs and generated report descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::{ClusteringPayload, SummaryStats};
use super::{AnalysisResult, ReportFormat};

/// Everything a report is built from besides its configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportData {
    /// Analysis results to report on
    pub analysis_results: Vec<AnalysisResult>,

    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub organization: Option<String>,

    /// Pre-computed summary, used instead of aggregating
    pub summary_stats: Option<SummaryStats>,

    /// Pre-computed clustering, used instead of running the engine
    pub clustering_data: Option<ClusteringPayload>,

    /// Extra free-form sections appended after the results
    pub custom_sections: Vec<ReportSection>,

    /// Caller metadata carried into the JSON output
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,

    /// Assigned at generation time when absent
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for ReportData {
    fn default() -> Self {
        Self {
            analysis_results: Vec::new(),
            title: "Compliance Analysis Report".to_string(),
            subtitle: None,
            author: None,
            organization: None,
            summary_stats: None,
            clustering_data: None,
            custom_sections: Vec::new(),
            metadata: None,
            generated_at: None,
        }
    }
}

impl ReportData {
    pub fn new(title: impl Into<String>, analysis_results: Vec<AnalysisResult>) -> Self {
        Self {
            title: title.into(),
            analysis_results,
            ..Self::default()
        }
    }
}

/// A titled block of caller-supplied content
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

/// Descriptor of a generated report artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportResult {
    /// Unique report identifier
    pub report_id: String,

    /// Absolute path of the artifact
    pub file_path: PathBuf,

    /// Artifact size in bytes
    pub file_size: u64,

    pub format: ReportFormat,

    /// Seconds spent generating
    pub generation_time: f64,

    /// Template requested for the report
    pub template_used: String,

    /// Estimated page count (PDF only)
    pub page_count: Option<u32>,

    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,

    pub error: Option<String>,
}
