use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::{ClusteringEngine, ClusteringOutcome, SummaryAggregator};
use crate::models::{
    generate_report_id, ReportConfig, ReportData, ReportError, ReportFormat, ReportResult,
    ReportSection,
};
use crate::rendering::{
    resolve_branding, DirectoryTemplateEngine, EnrichedModel, NullTemplateEngine, RenderPipeline,
    TemplateEngine, TextPdfRasterizer,
};
use crate::service::lookup::AnalysisLookup;
use crate::service::settings::ReportSettings;
use crate::storage::{sha256_hex, ReportStore, StoredArtifact};

/// Template name reported for artifacts found on disk
const UNKNOWN_TEMPLATE: &str = "unknown";

/// Generates, lists and deletes compliance reports
pub struct ReportService {
    settings: ReportSettings,
    store: ReportStore,
    pipeline: RenderPipeline,
    clustering: ClusteringEngine,
}

impl ReportService {
    /// Build a service with the built-in backends
    pub fn new(settings: ReportSettings) -> Result<Self, ReportError> {
        let store = ReportStore::new(&settings.output_dir)?;

        let templates: Box<dyn TemplateEngine> = match &settings.template_dir {
            Some(dir) => Box::new(DirectoryTemplateEngine::new(dir).map_err(|e| {
                ReportError::Template {
                    template: dir.display().to_string(),
                    reason: format!("{:#}", e),
                }
            })?),
            None => Box::new(NullTemplateEngine),
        };

        let pipeline = RenderPipeline::new(templates, Box::new(TextPdfRasterizer::default()))
            .with_default_stylesheet(settings.default_stylesheet())
            .with_strict_templates(settings.strict_templates);
        let clustering = ClusteringEngine::default().with_seed(settings.clustering_seed);

        Ok(Self::with_components(settings, store, pipeline, clustering))
    }

    /// Build a service from explicitly chosen components
    pub fn with_components(
        settings: ReportSettings,
        store: ReportStore,
        pipeline: RenderPipeline,
        clustering: ClusteringEngine,
    ) -> Self {
        Self {
            settings,
            store,
            pipeline,
            clustering,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Generate one report artifact
    ///
    /// On failure nothing generated for this report is left behind.
    pub fn generate(&self, config: &ReportConfig, data: &ReportData) -> Result<ReportResult, ReportError> {
        let started = Instant::now();
        self.pipeline.ensure_supported(config.format)?;

        let report_id = generate_report_id();
        info!(
            report_id = %report_id,
            format = %config.format,
            results = data.analysis_results.len(),
            "Generating report"
        );

        let mut written = Vec::new();
        match self.build_report(&report_id, config, data, &mut written) {
            Ok(mut result) => {
                result.generation_time = started.elapsed().as_secs_f64();
                info!(
                    report_id = %report_id,
                    path = %result.file_path.display(),
                    bytes = result.file_size,
                    "Report generated"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(report_id = %report_id, error = %e, "Report generation failed");
                self.store.remove_assets(&written);
                Err(e)
            }
        }
    }

    fn build_report(
        &self,
        report_id: &str,
        config: &ReportConfig,
        data: &ReportData,
        written: &mut Vec<PathBuf>,
    ) -> Result<ReportResult, ReportError> {
        let summary = match &data.summary_stats {
            Some(summary) => summary.clone(),
            None => SummaryAggregator::summarize(&data.analysis_results),
        };

        let clustering = self.resolve_clustering(config, data)?;
        let image = match &clustering {
            // Only images rendered here belong to the report
            Some(outcome) if data.clustering_data.is_none() => {
                outcome.payload().and_then(|p| p.plot_path.clone())
            }
            _ => None,
        };
        written.extend(image.iter().cloned());

        let branding = resolve_branding(&self.settings.branding, config);
        let model = EnrichedModel::build(report_id, data, config, summary, clustering, branding);
        let artifact = self.pipeline.render(&model)?;

        let path = self.store.write_artifact(report_id, config.format, &artifact.bytes)?;
        written.push(path.clone());

        if let Some(image) = &image {
            self.store.record_assets(report_id, std::slice::from_ref(image))?;
        }

        let mut metadata = Map::new();
        metadata.insert("checksum_sha256".to_string(), json!(sha256_hex(&artifact.bytes)));
        metadata.insert("analysis_count".to_string(), json!(data.analysis_results.len()));
        metadata.insert(
            "clustering".to_string(),
            json!(model.clustering.as_ref().map_or("skipped", |c| c.status())),
        );
        metadata.insert(
            "rendered_with".to_string(),
            json!(if artifact.used_fallback { "builtin" } else { "template" }),
        );
        if config.format == ReportFormat::Pdf {
            metadata.insert("rasterizer".to_string(), json!(self.pipeline.rasterizer_name()));
        }

        Ok(ReportResult {
            report_id: report_id.to_string(),
            file_path: fs::canonicalize(&path).unwrap_or(path),
            file_size: artifact.bytes.len() as u64,
            format: config.format,
            generation_time: 0.0,
            template_used: config.template_name.clone(),
            page_count: artifact.page_count,
            metadata: Some(metadata),
            error: None,
        })
    }

    fn resolve_clustering(
        &self,
        config: &ReportConfig,
        data: &ReportData,
    ) -> Result<Option<ClusteringOutcome>, ReportError> {
        if !config.include_clustering {
            return Ok(None);
        }

        if let Some(payload) = &data.clustering_data {
            debug!("Using pre-computed clustering");
            return Ok(Some(ClusteringOutcome::Clustered(payload.clone())));
        }

        self.clustering
            .analyze(&data.analysis_results, self.store.output_dir())
            .map(Some)
    }

    /// Look up a report by id
    pub fn get(&self, report_id: &str) -> Option<ReportResult> {
        self.store.find(report_id).map(stored_result)
    }

    /// Most recent PDF reports, newest first
    pub fn list(&self, limit: usize) -> Vec<ReportResult> {
        match self.store.list_pdfs(limit) {
            Ok(artifacts) => artifacts.into_iter().map(stored_result).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list reports");
                Vec::new()
            }
        }
    }

    /// Delete every artifact of a report; false when none existed
    pub fn delete(&self, report_id: &str) -> Result<bool, ReportError> {
        let removed = self.store.delete(report_id)?;
        if removed {
            info!(report_id, "Report deleted");
        } else {
            debug!(report_id, "No report to delete");
        }
        Ok(removed)
    }

    /// Generate several reports; failures are recorded per request
    pub fn generate_batch(&self, requests: &[ReportRequest], lookup: &dyn AnalysisLookup) -> BatchOutcome {
        let items = requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                match self.generate_request(request, lookup) {
                    Ok(report) => BatchItem::Completed { index, report },
                    Err(e) => {
                        warn!(index, error = %e, "Batch request failed");
                        BatchItem::Failed {
                            index,
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        let outcome = BatchOutcome { items };
        info!(
            completed = outcome.completed(),
            failed = outcome.failed(),
            "Batch generation finished"
        );
        outcome
    }

    fn generate_request(
        &self,
        request: &ReportRequest,
        lookup: &dyn AnalysisLookup,
    ) -> Result<ReportResult, ReportError> {
        let data = request.resolve(lookup);
        if data.analysis_results.is_empty() {
            return Err(ReportError::NoResults);
        }
        self.generate(&request.config, &data)
    }
}

fn stored_result(artifact: StoredArtifact) -> ReportResult {
    let metadata = artifact.modified.map(|modified| {
        let mut map = Map::new();
        map.insert("modified_at".to_string(), Value::String(modified.to_rfc3339()));
        map
    });

    ReportResult {
        report_id: artifact.report_id,
        file_path: artifact.path,
        file_size: artifact.size,
        format: artifact.format,
        generation_time: 0.0,
        template_used: UNKNOWN_TEMPLATE.to_string(),
        page_count: None,
        metadata,
        error: None,
    }
}

/// One report in a batch, referencing stored analyses by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub analysis_ids: Vec<String>,
    pub config: ReportConfig,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub organization: Option<String>,
    pub custom_sections: Vec<ReportSection>,
}

impl ReportRequest {
    pub fn new(analysis_ids: Vec<String>, config: ReportConfig) -> Self {
        Self {
            analysis_ids,
            config,
            ..Self::default()
        }
    }

    /// Build report data from the ids that resolve; unknown ids are skipped
    pub fn resolve(&self, lookup: &dyn AnalysisLookup) -> ReportData {
        let analysis_results = self
            .analysis_ids
            .iter()
            .filter_map(|id| {
                let result = lookup.get_analysis_result(id);
                if result.is_none() {
                    warn!(analysis_id = %id, "Skipping unknown analysis");
                }
                result
            })
            .collect();

        let mut data = ReportData {
            analysis_results,
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
            organization: self.organization.clone(),
            custom_sections: self.custom_sections.clone(),
            ..ReportData::default()
        };
        if let Some(title) = &self.title {
            data.title = title.clone();
        }
        data
    }
}

/// Result of one batch request
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Completed { index: usize, report: ReportResult },
    Failed { index: usize, error: String },
}

/// Per-request results of a batch, in request order
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatchOutcome {
    pub items: Vec<BatchItem>,
}

impl BatchOutcome {
    pub fn completed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, BatchItem::Completed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.completed()
    }

    pub fn reports(&self) -> impl Iterator<Item = &ReportResult> {
        self.items.iter().filter_map(|item| match item {
            BatchItem::Completed { report, .. } => Some(report),
            BatchItem::Failed { .. } => None,
        })
    }
}
