// Analysis Module
// Feature extraction, corpus summaries and clustering over analysis results

pub mod features;
pub mod summary;
pub mod numeric;
pub mod clustering;
pub mod plot;

pub use features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
pub use summary::{IssueFrequency, SummaryAggregator, SummaryStats};
pub use clustering::*;
pub use plot::{PngScatterPlotter, ScatterPlot, ScatterPlotter};
