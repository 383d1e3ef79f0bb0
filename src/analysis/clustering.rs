use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analysis::features::{
    FeatureExtractor, FeatureVector, COMPLIANCE_INDEX, CONFIDENCE_INDEX, FEATURE_NAMES,
    ISSUE_COUNT_INDEX, PROCESSING_TIME_INDEX,
};
use crate::analysis::numeric::{principal_components, standardize, KMeans};
use crate::analysis::plot::{cluster_color, PlotPoint, PlotSeries, ScatterPlot, ScatterPlotter};
use crate::models::{AnalysisResult, ReportError};

/// Seed used for reproducible clustering
pub const DEFAULT_CLUSTERING_SEED: u64 = 42;

/// Upper bound on the number of clusters
pub const MAX_CLUSTERS: usize = 3;

/// Prefix of clustering image file names
pub const CLUSTER_IMAGE_PREFIX: &str = "clustering_analysis_";

/// Timestamps tried when reserving an image name before giving up
const IMAGE_NAME_ATTEMPTS: i64 = 1000;

/// Number of clusters for `n` feature vectors
pub fn cluster_count(n: usize) -> usize {
    MAX_CLUSTERS.min(n / 2 + 1)
}

/// Raw output of a clustering backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFit {
    /// Cluster index per input row
    pub labels: Vec<usize>,
    /// 2D projection per input row
    pub coordinates: Vec<[f64; 2]>,
    /// Fraction of variance explained by each projected axis
    pub explained_variance_ratio: [f64; 2],
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Clustering backend is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Clustering computation failed: {reason}")]
    Computation { reason: String },
}

/// Numeric capability that clusters and projects standardized features
pub trait ClusteringBackend: Send + Sync {
    fn name(&self) -> &str;

    fn fit(&self, standardized: &[Vec<f64>], k: usize, seed: u64) -> Result<BackendFit, BackendError>;
}

/// In-process k-means and principal component projection
#[derive(Debug, Clone, Default)]
pub struct NativeClusteringBackend;

impl ClusteringBackend for NativeClusteringBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn fit(&self, standardized: &[Vec<f64>], k: usize, seed: u64) -> Result<BackendFit, BackendError> {
        let kmeans = KMeans::new(k, seed)
            .fit(standardized)
            .map_err(|reason| BackendError::Computation { reason })?;
        let projection =
            principal_components(standardized).map_err(|reason| BackendError::Computation { reason })?;

        Ok(BackendFit {
            labels: kmeans.labels,
            coordinates: projection.coordinates,
            explained_variance_ratio: projection.explained_variance_ratio,
        })
    }
}

/// Backend used when clustering is disabled at startup
#[derive(Debug, Clone, Default)]
pub struct NullClusteringBackend;

impl ClusteringBackend for NullClusteringBackend {
    fn name(&self) -> &str {
        "none"
    }

    fn fit(&self, _standardized: &[Vec<f64>], _k: usize, _seed: u64) -> Result<BackendFit, BackendError> {
        Err(BackendError::Unavailable {
            reason: "no clustering backend configured".to_string(),
        })
    }
}

/// Descriptive statistics for one cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterStats {
    pub cluster_id: usize,
    pub size: usize,
    /// Labels of the member results
    pub members: Vec<String>,
    pub avg_compliance_score: f64,
    pub avg_confidence_score: f64,
    pub avg_issue_count: f64,
    pub avg_processing_time: f64,
    /// Qualitative statements derived from the averages
    pub characteristics: Vec<String>,
    pub description: String,
}

/// A projected point of the clustering scatter plot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterPoint {
    pub label: String,
    pub cluster_id: usize,
    pub x: f64,
    pub y: f64,
}

/// Clustering attached to a report
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringPayload {
    /// Number of non-empty clusters
    pub n_clusters: usize,
    pub clusters: Vec<ClusterStats>,
    pub points: Vec<ClusterPoint>,
    /// Local path of the rendered scatter plot
    pub plot_path: Option<PathBuf>,
    pub explained_variance_ratio: Vec<f64>,
    pub feature_names: Vec<String>,
}

/// What the clustering step contributed to a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusteringOutcome {
    Clustered(ClusteringPayload),
    InsufficientData { feature_count: usize, message: String },
    Unavailable { message: String },
}

impl ClusteringOutcome {
    pub fn payload(&self) -> Option<&ClusteringPayload> {
        match self {
            ClusteringOutcome::Clustered(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ClusteringOutcome::Clustered(_) => "clustered",
            ClusteringOutcome::InsufficientData { .. } => "insufficient_data",
            ClusteringOutcome::Unavailable { .. } => "unavailable",
        }
    }
}

/// Qualitative description of a cluster's averages
pub fn characterize(avg_compliance: f64, avg_issues: f64, avg_processing_time: f64) -> Vec<String> {
    let mut characteristics = Vec::new();

    if avg_compliance > 0.8 {
        characteristics.push("High compliance scores".to_string());
    } else if avg_compliance < 0.5 {
        characteristics.push("Low compliance scores".to_string());
    } else {
        characteristics.push("Moderate compliance scores".to_string());
    }

    if avg_issues > 5.0 {
        characteristics.push("High number of issues".to_string());
    } else if avg_issues < 2.0 {
        characteristics.push("Few issues identified".to_string());
    }

    if avg_processing_time > 10.0 {
        characteristics.push("Longer processing times".to_string());
    } else if avg_processing_time < 3.0 {
        characteristics.push("Quick to analyze".to_string());
    }

    characteristics
}

/// Clusters analysis results and renders the projection
pub struct ClusteringEngine {
    backend: Box<dyn ClusteringBackend>,
    plotter: Box<dyn ScatterPlotter>,
    seed: u64,
}

impl ClusteringEngine {
    pub fn new(backend: Box<dyn ClusteringBackend>, plotter: Box<dyn ScatterPlotter>) -> Self {
        Self {
            backend,
            plotter,
            seed: DEFAULT_CLUSTERING_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Cluster the results, writing the scatter plot into `image_dir`
    pub fn analyze(&self, results: &[AnalysisResult], image_dir: &Path) -> Result<ClusteringOutcome, ReportError> {
        let features = FeatureExtractor::extract_all(results);
        if features.len() < 2 {
            debug!(feature_count = features.len(), "Not enough feature vectors for clustering");
            return Ok(ClusteringOutcome::InsufficientData {
                feature_count: features.len(),
                message: "Insufficient data for clustering analysis".to_string(),
            });
        }

        let mut payload = match self.cluster(&features)? {
            Some(payload) => payload,
            None => {
                return Ok(ClusteringOutcome::Unavailable {
                    message: "Clustering backend is not available".to_string(),
                })
            }
        };

        let image_path = self.reserve_image_path(image_dir)?;
        if let Err(e) = self.plotter.render(&Self::scatter_plot(&payload), &image_path) {
            let _ = fs::remove_file(&image_path);
            return Err(ReportError::storage("Failed to render clustering plot", format!("{:#}", e)));
        }
        payload.plot_path = Some(image_path);

        info!(
            n_clusters = payload.n_clusters,
            points = payload.points.len(),
            backend = self.backend.name(),
            "Clustering analysis complete"
        );
        Ok(ClusteringOutcome::Clustered(payload))
    }

    /// Claim `clustering_analysis_{millis}.{ext}`, moving to the next free millisecond on collision
    fn reserve_image_path(&self, image_dir: &Path) -> Result<PathBuf, ReportError> {
        let now = chrono::Utc::now().timestamp_millis();
        for stamp in now..now + IMAGE_NAME_ATTEMPTS {
            let path = image_dir.join(format!(
                "{}{}.{}",
                CLUSTER_IMAGE_PREFIX,
                stamp,
                self.plotter.extension()
            ));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ReportError::storage("Failed to create clustering image", e)),
            }
        }
        Err(ReportError::storage(
            "Failed to create clustering image",
            format!("no free name in {}", image_dir.display()),
        ))
    }

    /// Cluster feature vectors without rendering; `None` when the backend is unavailable
    pub fn cluster(&self, features: &[FeatureVector]) -> Result<Option<ClusteringPayload>, ReportError> {
        let raw: Vec<Vec<f64>> = features.iter().map(|f| f.values.to_vec()).collect();
        let standardized = standardize(&raw);
        let k = cluster_count(features.len());

        let fit = match self.backend.fit(&standardized, k, self.seed) {
            Ok(fit) => fit,
            Err(BackendError::Unavailable { reason }) => {
                warn!(%reason, "Clustering skipped");
                return Ok(None);
            }
            Err(BackendError::Computation { reason }) => {
                return Err(ReportError::Clustering { reason });
            }
        };

        if fit.labels.len() != features.len() || fit.coordinates.len() != features.len() {
            return Err(ReportError::Clustering {
                reason: format!(
                    "backend returned {} labels and {} coordinates for {} points",
                    fit.labels.len(),
                    fit.coordinates.len(),
                    features.len()
                ),
            });
        }

        let clusters: Vec<ClusterStats> = (0..k)
            .filter_map(|cluster_id| Self::cluster_stats(cluster_id, features, &fit.labels))
            .collect();
        if clusters.len() < k {
            debug!(requested = k, populated = clusters.len(), "Some clusters received no members");
        }

        let points = features
            .iter()
            .zip(fit.labels.iter().zip(&fit.coordinates))
            .map(|(feature, (&cluster_id, coords))| ClusterPoint {
                label: feature.label.clone(),
                cluster_id,
                x: coords[0],
                y: coords[1],
            })
            .collect();

        Ok(Some(ClusteringPayload {
            n_clusters: clusters.len(),
            clusters,
            points,
            plot_path: None,
            explained_variance_ratio: fit.explained_variance_ratio.to_vec(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }))
    }

    fn cluster_stats(cluster_id: usize, features: &[FeatureVector], labels: &[usize]) -> Option<ClusterStats> {
        let members: Vec<&FeatureVector> = features
            .iter()
            .zip(labels)
            .filter(|(_, label)| **label == cluster_id)
            .map(|(feature, _)| feature)
            .collect();
        if members.is_empty() {
            return None;
        }

        let avg = |index: usize| members.iter().map(|m| m.values[index]).sum::<f64>() / members.len() as f64;
        let avg_compliance_score = avg(COMPLIANCE_INDEX);
        let avg_issue_count = avg(ISSUE_COUNT_INDEX);
        let avg_processing_time = avg(PROCESSING_TIME_INDEX);
        let characteristics = characterize(avg_compliance_score, avg_issue_count, avg_processing_time);

        Some(ClusterStats {
            cluster_id,
            size: members.len(),
            members: members.iter().map(|m| m.label.clone()).collect(),
            avg_compliance_score,
            avg_confidence_score: avg(CONFIDENCE_INDEX),
            avg_issue_count,
            avg_processing_time,
            description: characteristics.join(", "),
            characteristics,
        })
    }

    fn scatter_plot(payload: &ClusteringPayload) -> ScatterPlot {
        let ratio = |axis: usize| payload.explained_variance_ratio.get(axis).copied().unwrap_or(0.0) * 100.0;

        let series = payload
            .clusters
            .iter()
            .map(|cluster| cluster.cluster_id)
            .map(|cluster_id| PlotSeries {
                name: format!("Cluster {}", cluster_id + 1),
                color: cluster_color(cluster_id),
                points: payload
                    .points
                    .iter()
                    .filter(|p| p.cluster_id == cluster_id)
                    .map(|p| PlotPoint {
                        x: p.x,
                        y: p.y,
                        label: p.label.clone(),
                    })
                    .collect(),
            })
            .filter(|series| !series.points.is_empty())
            .collect();

        ScatterPlot {
            title: "Protocol Clustering Analysis".to_string(),
            x_label: format!("First Principal Component ({:.1}% variance)", ratio(0)),
            y_label: format!("Second Principal Component ({:.1}% variance)", ratio(1)),
            series,
        }
    }
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self::new(
            Box::new(NativeClusteringBackend),
            Box::new(crate::analysis::plot::PngScatterPlotter::default()),
        )
    }
}
