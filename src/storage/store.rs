use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::models::{ReportError, ReportFormat};

/// Prefix shared by every report artifact
pub const REPORT_PREFIX: &str = "report_";

/// Suffix of per-report asset manifests
pub const MANIFEST_SUFFIX: &str = ".assets.json";

/// A report artifact found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub report_id: String,
    pub path: PathBuf,
    pub format: ReportFormat,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Files generated alongside a report, removed when it is deleted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetManifest {
    pub report_id: String,
    pub assets: Vec<PathBuf>,
}

/// Flat directory of report artifacts keyed by report id
pub struct ReportStore {
    output_dir: PathBuf,
}

impl ReportStore {
    /// Open a store, creating the output directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, ReportError> {
        let output_dir = output_dir.as_ref().to_path_buf();

        fs::create_dir_all(&output_dir).map_err(|e| {
            ReportError::storage(
                format!("Failed to create output directory {}", output_dir.display()),
                e,
            )
        })?;

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact_path(&self, report_id: &str, format: ReportFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", report_id, format.extension()))
    }

    pub fn manifest_path(&self, report_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", report_id, MANIFEST_SUFFIX))
    }

    /// Write the single artifact for a report
    pub fn write_artifact(
        &self,
        report_id: &str,
        format: ReportFormat,
        bytes: &[u8],
    ) -> Result<PathBuf, ReportError> {
        let path = self.artifact_path(report_id, format);
        fs::write(&path, bytes)
            .map_err(|e| ReportError::storage(format!("Failed to write {}", path.display()), e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote report artifact");
        Ok(path)
    }

    /// Record the assets generated for a report
    pub fn record_assets(&self, report_id: &str, assets: &[PathBuf]) -> Result<(), ReportError> {
        let manifest = AssetManifest {
            report_id: report_id.to_string(),
            assets: assets.to_vec(),
        };
        let path = self.manifest_path(report_id);
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| ReportError::storage("Failed to serialize asset manifest", e))?;

        fs::write(&path, json)
            .map_err(|e| ReportError::storage(format!("Failed to write {}", path.display()), e))
    }

    /// Assets listed in a report's manifest; empty when there is none
    pub fn tracked_assets(&self, report_id: &str) -> Vec<PathBuf> {
        let path = self.manifest_path(report_id);
        let Ok(content) = fs::read_to_string(&path) else {
            return Vec::new();
        };

        match serde_json::from_str::<AssetManifest>(&content) {
            Ok(manifest) => manifest.assets,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable asset manifest");
                Vec::new()
            }
        }
    }

    /// Locate a report, probing pdf, html and json in that order
    pub fn find(&self, report_id: &str) -> Option<StoredArtifact> {
        if !is_valid_report_id(report_id) {
            return None;
        }

        ReportFormat::lookup_order()
            .into_iter()
            .map(|format| (format, self.artifact_path(report_id, format)))
            .find(|(_, path)| path.is_file())
            .and_then(|(format, path)| describe(report_id, format, path))
    }

    /// PDF reports, newest first
    pub fn list_pdfs(&self, limit: usize) -> Result<Vec<StoredArtifact>, ReportError> {
        let entries = fs::read_dir(&self.output_dir).map_err(|e| {
            ReportError::storage(format!("Failed to read {}", self.output_dir.display()), e)
        })?;

        let mut artifacts: Vec<StoredArtifact> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some(ReportFormat::Pdf.extension()) {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?.to_string();
                if !stem.starts_with(REPORT_PREFIX) {
                    return None;
                }
                describe(&stem, ReportFormat::Pdf, path)
            })
            .collect();

        // Newest first; ties broken by id for a stable order
        artifacts.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.report_id.cmp(&a.report_id))
        });
        artifacts.truncate(limit);

        Ok(artifacts)
    }

    /// Remove every format variant and tracked asset of a report
    ///
    /// Returns true when at least one artifact was removed. Assets and the
    /// manifest are cleaned up either way.
    pub fn delete(&self, report_id: &str) -> Result<bool, ReportError> {
        if !is_valid_report_id(report_id) {
            return Ok(false);
        }

        let mut removed = false;
        for format in ReportFormat::lookup_order() {
            let path = self.artifact_path(report_id, format);
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| {
                    ReportError::storage(format!("Failed to delete {}", path.display()), e)
                })?;
                removed = true;
            }
        }

        self.remove_assets(&self.tracked_assets(report_id));

        let manifest = self.manifest_path(report_id);
        if manifest.is_file() {
            fs::remove_file(&manifest).map_err(|e| {
                ReportError::storage(format!("Failed to delete {}", manifest.display()), e)
            })?;
        }

        Ok(removed)
    }

    /// Best-effort removal of generated files
    pub fn remove_assets(&self, assets: &[PathBuf]) {
        for asset in assets {
            if !asset.is_file() {
                continue;
            }
            match fs::remove_file(asset) {
                Ok(()) => debug!(path = %asset.display(), "Removed report asset"),
                Err(e) => warn!(path = %asset.display(), error = %e, "Failed to remove report asset"),
            }
        }
    }
}

fn describe(report_id: &str, format: ReportFormat, path: PathBuf) -> Option<StoredArtifact> {
    let metadata = fs::metadata(&path).ok()?;
    let modified = metadata
        .modified()
        .ok()
        .map(|time: SystemTime| DateTime::<Utc>::from(time));

    Some(StoredArtifact {
        report_id: report_id.to_string(),
        size: metadata.len(),
        path,
        format,
        modified,
    })
}

/// Ids never contain path components
pub fn is_valid_report_id(report_id: &str) -> bool {
    !report_id.is_empty()
        && !report_id.contains(['/', '\\'])
        && !report_id.contains("..")
}

/// Hex SHA-256 of an artifact's bytes
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, ReportStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = ReportStore::new(temp_dir.path().join("reports")).unwrap();
        (temp_dir, store)
    }

    fn write_with_mtime(path: &Path, age_secs: u64) {
        fs::write(path, b"%PDF-1.4").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_new_creates_directory() {
        let (_temp_dir, store) = create_test_store();
        assert!(store.output_dir().is_dir());
    }

    #[test]
    fn test_find_checks_formats_in_order() {
        let (_temp_dir, store) = create_test_store();
        store.write_artifact("report_1", ReportFormat::Json, b"{}").unwrap();
        assert_eq!(store.find("report_1").unwrap().format, ReportFormat::Json);

        store.write_artifact("report_1", ReportFormat::Html, b"<html></html>").unwrap();
        let found = store.find("report_1").unwrap();
        assert_eq!(found.format, ReportFormat::Html);
        assert_eq!(found.size, 13);

        store.write_artifact("report_1", ReportFormat::Pdf, b"%PDF").unwrap();
        assert_eq!(store.find("report_1").unwrap().format, ReportFormat::Pdf);

        assert!(store.find("report_2").is_none());
    }

    #[test]
    fn test_find_rejects_path_ids() {
        let (temp_dir, store) = create_test_store();
        fs::write(temp_dir.path().join("secret.json"), "{}").unwrap();
        assert!(store.find("../secret").is_none());
        assert!(store.find("a/b").is_none());
        assert!(!store.delete("../secret").unwrap());
        assert!(temp_dir.path().join("secret.json").exists());
    }

    #[test]
    fn test_list_newest_first() {
        let (_temp_dir, store) = create_test_store();
        for (i, age) in [50u64, 10, 40, 20, 30].iter().enumerate() {
            write_with_mtime(&store.artifact_path(&format!("report_{}", i), ReportFormat::Pdf), *age);
        }
        // Non-PDF and foreign files are ignored
        fs::write(store.artifact_path("report_9", ReportFormat::Html), "x").unwrap();
        fs::write(store.output_dir().join("notes.pdf"), "x").unwrap();

        let listed = store.list_pdfs(2).unwrap();
        let ids: Vec<&str> = listed.iter().map(|a| a.report_id.as_str()).collect();
        assert_eq!(ids, vec!["report_1", "report_3"]);

        assert_eq!(store.list_pdfs(100).unwrap().len(), 5);
    }

    #[test]
    fn test_delete_all_variants() {
        let (_temp_dir, store) = create_test_store();
        store.write_artifact("report_123", ReportFormat::Pdf, b"%PDF").unwrap();
        store.write_artifact("report_123", ReportFormat::Json, b"{}").unwrap();

        assert!(store.delete("report_123").unwrap());
        assert!(!store.artifact_path("report_123", ReportFormat::Pdf).exists());
        assert!(!store.artifact_path("report_123", ReportFormat::Json).exists());
        assert!(!store.delete("report_123").unwrap());
    }

    #[test]
    fn test_delete_removes_tracked_assets() {
        let (_temp_dir, store) = create_test_store();
        let image = store.output_dir().join("clustering_analysis_1.png");
        let unrelated = store.output_dir().join("clustering_analysis_2.png");
        fs::write(&image, b"png").unwrap();
        fs::write(&unrelated, b"png").unwrap();

        store.write_artifact("report_5", ReportFormat::Html, b"<html/>").unwrap();
        store.record_assets("report_5", &[image.clone()]).unwrap();
        assert_eq!(store.tracked_assets("report_5"), vec![image.clone()]);

        assert!(store.delete("report_5").unwrap());
        assert!(!image.exists());
        assert!(unrelated.exists());
        assert!(!store.manifest_path("report_5").exists());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_valid_report_ids() {
        assert!(is_valid_report_id("report_1700000000000_abc"));
        assert!(!is_valid_report_id(""));
        assert!(!is_valid_report_id("..\\x"));
    }
}
