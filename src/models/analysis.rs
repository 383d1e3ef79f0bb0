//! Analysis results consumed by the report pipeline
//!
//! Results come from an upstream compliance analyzer and are treated as
//! read-only. Every field is optional; consumers read them through the
//! accessor methods, which apply the documented defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status used when a compliance record carries no status
pub const UNKNOWN_STATUS: &str = "unknown";

/// A single prior analysis of a protocol document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisResult {
    /// Identifier assigned by the analyzer
    pub analysis_id: Option<String>,

    /// Title of the analyzed protocol
    pub protocol_title: Option<String>,

    /// Protocol type (e.g. "clinical_trial")
    pub protocol_type: Option<String>,

    /// Compliance assessment, absent when the analysis produced none
    #[serde(alias = "compliance_analysis")]
    pub compliance: Option<ComplianceAssessment>,

    /// Wall-clock seconds spent analyzing
    pub processing_time: Option<f64>,

    /// Sections of other documents found similar to this one
    pub similar_sections: Vec<SimilarSection>,

    /// When the analysis was produced
    pub created_at: Option<DateTime<Utc>>,
}

/// Compliance sub-record of an analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComplianceAssessment {
    pub compliance_score: Option<f64>,
    pub compliance_status: Option<String>,
    pub confidence_score: Option<f64>,
    pub issues: Vec<Finding>,
    pub recommendations: Vec<Finding>,
}

/// An issue or recommendation, either free text or a structured record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Finding {
    Text(String),
    Detailed(DetailedFinding),
}

/// Structured issue or recommendation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetailedFinding {
    pub description: Option<String>,
    pub severity: Option<String>,
    pub section: Option<String>,
    pub category: Option<String>,
}

/// Reference to a similar section found in another document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarSection {
    pub section_title: Option<String>,
    pub source_document: Option<String>,
    pub similarity_score: Option<f64>,
}

impl Finding {
    /// Display text of the finding
    pub fn text(&self) -> String {
        match self {
            Finding::Text(text) => text.clone(),
            Finding::Detailed(detail) => {
                let description = detail.description.as_deref().unwrap_or("Unspecified finding");
                match &detail.severity {
                    Some(severity) => format!("[{}] {}", severity, description),
                    None => description.to_string(),
                }
            }
        }
    }

    /// Key used when counting identical findings across results
    pub fn key(&self) -> String {
        match self {
            Finding::Text(text) => text.clone(),
            Finding::Detailed(detail) => detail
                .description
                .clone()
                .unwrap_or_else(|| "Unspecified finding".to_string()),
        }
    }
}

impl SimilarSection {
    pub fn display(&self) -> String {
        let title = self.section_title.as_deref().unwrap_or("Untitled section");
        match (&self.source_document, self.similarity_score) {
            (Some(source), Some(score)) => format!("{} ({}, {:.0}%)", title, source, score * 100.0),
            (Some(source), None) => format!("{} ({})", title, source),
            (None, Some(score)) => format!("{} ({:.0}%)", title, score * 100.0),
            (None, None) => title.to_string(),
        }
    }
}

impl AnalysisResult {
    pub fn has_compliance(&self) -> bool {
        self.compliance.is_some()
    }

    pub fn compliance_score(&self) -> Option<f64> {
        self.compliance.as_ref().and_then(|c| c.compliance_score)
    }

    /// Status string, "unknown" when missing
    pub fn compliance_status(&self) -> &str {
        self.compliance
            .as_ref()
            .and_then(|c| c.compliance_status.as_deref())
            .unwrap_or(UNKNOWN_STATUS)
    }

    pub fn confidence_score(&self) -> Option<f64> {
        self.compliance.as_ref().and_then(|c| c.confidence_score)
    }

    pub fn issues(&self) -> &[Finding] {
        self.compliance.as_ref().map_or(&[], |c| c.issues.as_slice())
    }

    pub fn recommendations(&self) -> &[Finding] {
        self.compliance.as_ref().map_or(&[], |c| c.recommendations.as_slice())
    }

    /// Protocol title or a positional placeholder ("Protocol 3")
    pub fn label(&self, position: usize) -> String {
        match self.protocol_title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.to_string(),
            _ => format!("Protocol {}", position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let result: AnalysisResult = serde_json::from_str("{}").unwrap();
        assert!(!result.has_compliance());
        assert_eq!(result.compliance_status(), UNKNOWN_STATUS);
        assert_eq!(result.compliance_score(), None);
        assert!(result.issues().is_empty());
        assert_eq!(result.label(4), "Protocol 4");
    }

    #[test]
    fn test_mixed_findings() {
        let json = r#"{
            "protocol_title": "Phase II Oncology",
            "compliance_analysis": {
                "compliance_score": 0.72,
                "compliance_status": "partially_compliant",
                "issues": [
                    "Missing consent form",
                    {"description": "Dosage table incomplete", "severity": "high"}
                ]
            }
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.label(1), "Phase II Oncology");
        assert_eq!(result.compliance_status(), "partially_compliant");
        assert_eq!(result.issues().len(), 2);
        assert_eq!(result.issues()[0].text(), "Missing consent form");
        assert_eq!(result.issues()[1].text(), "[high] Dosage table incomplete");
        assert_eq!(result.issues()[1].key(), "Dosage table incomplete");
    }

    #[test]
    fn test_similar_section_display() {
        let section = SimilarSection {
            section_title: Some("Eligibility".to_string()),
            source_document: Some("PROTO-7".to_string()),
            similarity_score: Some(0.91),
        };
        assert_eq!(section.display(), "Eligibility (PROTO-7, 91%)");
        assert_eq!(SimilarSection::default().display(), "Untitled section");
    }
}
