use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::AnalysisResult;
use crate::service::input::load_document;
use crate::storage::is_valid_report_id;

/// Source of previously stored analysis results
pub trait AnalysisLookup {
    fn get_analysis_result(&self, analysis_id: &str) -> Option<AnalysisResult>;
}

/// Lookup over results held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    results: HashMap<String, AnalysisResult>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, analysis_id: impl Into<String>, result: AnalysisResult) {
        self.results.insert(analysis_id.into(), result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FromIterator<(String, AnalysisResult)> for InMemoryLookup {
    fn from_iter<I: IntoIterator<Item = (String, AnalysisResult)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl AnalysisLookup for InMemoryLookup {
    fn get_analysis_result(&self, analysis_id: &str) -> Option<AnalysisResult> {
        self.results.get(analysis_id).cloned()
    }
}

/// Lookup reading `{analysis_id}.json` from a directory
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    root: PathBuf,
}

impl DirectoryLookup {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AnalysisLookup for DirectoryLookup {
    fn get_analysis_result(&self, analysis_id: &str) -> Option<AnalysisResult> {
        if !is_valid_report_id(analysis_id) {
            return None;
        }

        let path = self.root.join(format!("{}.json", analysis_id));
        if !path.is_file() {
            return None;
        }

        match load_document::<AnalysisResult>(&path) {
            Ok(mut result) => {
                result.analysis_id.get_or_insert_with(|| analysis_id.to_string());
                Some(result)
            }
            Err(e) => {
                warn!(analysis_id, error = %format!("{:#}", e), "Unreadable analysis result");
                None
            }
        }
    }
}
