//! Data models for compliance report generation
//!
//! Analysis results are consumed read-only, configuration is immutable once
//! handed to the service, and report descriptors are created only after an
//! artifact has been written.

pub mod analysis;
pub mod config;
pub mod report;

pub use analysis::*;
pub use config::*;
pub use report::*;

use uuid::Uuid;

/// Generate a new report identifier
///
/// Ids embed the creation time in milliseconds followed by a full v4 UUID, so
/// they sort roughly by creation and never depend on a short random suffix.
pub fn generate_report_id() -> String {
    format!(
        "report_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Errors surfaced by report generation
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Unsupported report format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Template '{template}' could not be rendered: {reason}")]
    Template { template: String, reason: String },

    #[error("PDF rendering backend is unavailable: {reason}")]
    RenderBackendUnavailable { reason: String },

    #[error("Rendering failed: {reason}")]
    Render { reason: String },

    #[error("Clustering failed: {reason}")]
    Clustering { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("No valid analysis results found")]
    NoResults,
}

impl ReportError {
    pub(crate) fn storage(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        ReportError::Storage {
            reason: format!("{}: {}", context, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_ids_are_distinct() {
        let ids: std::collections::HashSet<String> = (0..500).map(|_| generate_report_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("report_")));
    }

    #[test]
    fn test_error_messages() {
        let err = ReportError::UnsupportedFormat { format: "docx".to_string() };
        assert_eq!(err.to_string(), "Unsupported report format: docx");

        let err = ReportError::storage("Failed to write /tmp/x.pdf", "disk full");
        assert_eq!(err.to_string(), "Storage error: Failed to write /tmp/x.pdf: disk full");
    }
}
