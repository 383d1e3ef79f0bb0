// Storage Module
// Report artifacts and their generated assets on disk

pub mod store;

pub use store::{is_valid_report_id, sha256_hex, AssetManifest, ReportStore, StoredArtifact};
