use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::AnalysisResult;

/// Number of issues listed under common issues
pub const COMMON_ISSUE_LIMIT: usize = 5;

/// Corpus-level statistics over a set of analysis results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryStats {
    /// Number of results in the report
    pub total_analyses: usize,
    /// Mean compliance score over results that have one
    pub avg_compliance_score: f64,
    /// Result count per compliance status
    pub compliance_distribution: BTreeMap<String, usize>,
    /// Mean processing time over results that have one
    pub avg_processing_time: f64,
    /// Sum of issue counts
    pub total_issues: usize,
    /// Most frequent issues, most common first
    pub common_issues: Vec<IssueFrequency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueFrequency {
    pub issue: String,
    pub count: usize,
}

/// Computes summary statistics independent of clustering
pub struct SummaryAggregator;

impl SummaryAggregator {
    pub fn summarize(results: &[AnalysisResult]) -> SummaryStats {
        let scores: Vec<f64> = results.iter().filter_map(|r| r.compliance_score()).collect();
        let times: Vec<f64> = results.iter().filter_map(|r| r.processing_time).collect();

        let mut compliance_distribution = BTreeMap::new();
        for result in results.iter().filter(|r| r.has_compliance()) {
            *compliance_distribution
                .entry(result.compliance_status().to_string())
                .or_insert(0) += 1;
        }

        let total_issues = results.iter().map(|r| r.issues().len()).sum();

        SummaryStats {
            total_analyses: results.len(),
            avg_compliance_score: mean(&scores),
            compliance_distribution,
            avg_processing_time: mean(&times),
            total_issues,
            common_issues: Self::common_issues(results, COMMON_ISSUE_LIMIT),
        }
    }

    /// Top issues by descending count; ties keep first-seen order
    pub fn common_issues(results: &[AnalysisResult], limit: usize) -> Vec<IssueFrequency> {
        let mut first_seen: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for issue in results.iter().flat_map(|r| r.issues()) {
            let key = issue.key();
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(key);
            }
            *count += 1;
        }

        let mut ranked: Vec<IssueFrequency> = first_seen
            .into_iter()
            .map(|issue| {
                let count = counts[&issue];
                IssueFrequency { issue, count }
            })
            .collect();
        // Stable sort keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(limit);
        ranked
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceAssessment, DetailedFinding, Finding};

    fn create_test_result(score: Option<f64>, status: Option<&str>, issues: &[&str], time: Option<f64>) -> AnalysisResult {
        AnalysisResult {
            processing_time: time,
            compliance: Some(ComplianceAssessment {
                compliance_score: score,
                compliance_status: status.map(str::to_string),
                issues: issues.iter().map(|i| Finding::Text(i.to_string())).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = SummaryAggregator::summarize(&[]);
        assert_eq!(summary.total_analyses, 0);
        assert_eq!(summary.avg_compliance_score, 0.0);
        assert!(summary.compliance_distribution.is_empty());
        assert_eq!(summary.avg_processing_time, 0.0);
        assert_eq!(summary.total_issues, 0);
        assert!(summary.common_issues.is_empty());
    }

    #[test]
    fn test_summary_statistics() {
        let results = vec![
            create_test_result(Some(0.9), Some("compliant"), &["a"], Some(2.0)),
            create_test_result(Some(0.5), Some("non_compliant"), &["a", "b"], None),
            create_test_result(None, None, &[], Some(4.0)),
            AnalysisResult::default(),
        ];

        let summary = SummaryAggregator::summarize(&results);
        assert_eq!(summary.total_analyses, 4);
        assert!((summary.avg_compliance_score - 0.7).abs() < 1e-9);
        assert!((summary.avg_processing_time - 3.0).abs() < 1e-9);
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.compliance_distribution.get("compliant"), Some(&1));
        assert_eq!(summary.compliance_distribution.get("non_compliant"), Some(&1));
        assert_eq!(summary.compliance_distribution.get("unknown"), Some(&1));
        assert_eq!(summary.compliance_distribution.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_common_issues_ordering() {
        let results = vec![
            create_test_result(None, None, &["late", "consent", "dosage"], None),
            create_test_result(None, None, &["dosage", "storage", "labels", "audit"], None),
            create_test_result(None, None, &["consent", "extra"], None),
        ];

        let common = SummaryAggregator::common_issues(&results, 5);
        let names: Vec<&str> = common.iter().map(|c| c.issue.as_str()).collect();
        assert_eq!(names, vec!["consent", "dosage", "late", "storage", "labels"]);
        assert_eq!(common[0].count, 2);
        assert_eq!(common[2].count, 1);
    }

    #[test]
    fn test_structured_issues_count_by_description() {
        let detailed = |severity: &str| {
            Finding::Detailed(DetailedFinding {
                description: Some("Missing signature".to_string()),
                severity: Some(severity.to_string()),
                ..Default::default()
            })
        };
        let mut result = create_test_result(None, None, &[], None);
        if let Some(compliance) = result.compliance.as_mut() {
            compliance.issues = vec![detailed("low"), detailed("high")];
        }

        let common = SummaryAggregator::common_issues(&[result], 5);
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].count, 2);
    }
}
