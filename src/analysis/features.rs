use serde::{Deserialize, Serialize};

use crate::models::AnalysisResult;

/// Names of the feature dimensions, in vector order
pub const FEATURE_NAMES: [&str; 5] = [
    "compliance_score",
    "confidence_score",
    "issue_count",
    "recommendation_count",
    "processing_time",
];

pub const COMPLIANCE_INDEX: usize = 0;
pub const CONFIDENCE_INDEX: usize = 1;
pub const ISSUE_COUNT_INDEX: usize = 2;
pub const PROCESSING_TIME_INDEX: usize = 4;

/// Numeric summary of one analysis result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    /// Display label of the result
    pub label: String,
    /// Position of the result in the input batch
    pub source_index: usize,
    pub values: [f64; 5],
}

/// Turns analysis results into clustering features
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract features for one result; `None` when it has no compliance record
    pub fn extract(result: &AnalysisResult, position: usize) -> Option<FeatureVector> {
        let compliance = result.compliance.as_ref()?;

        Some(FeatureVector {
            label: result.label(position),
            source_index: position.saturating_sub(1),
            values: [
                compliance.compliance_score.unwrap_or(0.0),
                compliance.confidence_score.unwrap_or(0.0),
                compliance.issues.len() as f64,
                compliance.recommendations.len() as f64,
                result.processing_time.unwrap_or(0.0),
            ],
        })
    }

    /// Extract features for a batch, skipping results without compliance data
    pub fn extract_all(results: &[AnalysisResult]) -> Vec<FeatureVector> {
        results
            .iter()
            .enumerate()
            .filter_map(|(i, result)| Self::extract(result, i + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceAssessment, Finding};

    fn create_test_result(title: Option<&str>, score: f64) -> AnalysisResult {
        AnalysisResult {
            protocol_title: title.map(str::to_string),
            processing_time: Some(4.5),
            compliance: Some(ComplianceAssessment {
                compliance_score: Some(score),
                compliance_status: Some("compliant".to_string()),
                confidence_score: None,
                issues: vec![Finding::Text("a".to_string()), Finding::Text("b".to_string())],
                recommendations: vec![Finding::Text("r".to_string())],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_defaults_missing_values() {
        let features = FeatureExtractor::extract(&create_test_result(Some("Trial A"), 0.9), 1).unwrap();
        assert_eq!(features.label, "Trial A");
        assert_eq!(features.values, [0.9, 0.0, 2.0, 1.0, 4.5]);
    }

    #[test]
    fn test_results_without_compliance_are_skipped() {
        let results = vec![
            create_test_result(None, 0.4),
            AnalysisResult::default(),
            create_test_result(None, 0.8),
        ];
        let features = FeatureExtractor::extract_all(&results);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].label, "Protocol 1");
        assert_eq!(features[1].label, "Protocol 3");
        assert_eq!(features[1].source_index, 2);
    }
}
