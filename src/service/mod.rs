// Service Module
// Report generation entry points, settings and analysis lookup

pub mod generator;
pub mod input;
pub mod lookup;
pub mod settings;

pub use generator::{BatchItem, BatchOutcome, ReportRequest, ReportService};
pub use input::{load_document, InputFormat};
pub use lookup::{AnalysisLookup, DirectoryLookup, InMemoryLookup};
pub use settings::ReportSettings;
