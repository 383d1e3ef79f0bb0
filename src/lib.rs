//! Compliance report synthesis
//!
//! Turns stored compliance analysis results into PDF, HTML or JSON reports,
//! with corpus summaries and optional clustering of the analyzed protocols.

pub mod analysis;
pub mod cli;
pub mod models;
pub mod rendering;
pub mod service;
pub mod storage;

pub use models::{ReportConfig, ReportData, ReportError, ReportFormat, ReportResult};
pub use service::{ReportService, ReportSettings};
