//! Portable JSON serialization of the enriched model

use serde_json::Value;

use crate::rendering::model::EnrichedModel;

/// Keys whose values are local filesystem paths
pub const LOCAL_PATH_KEYS: &[&str] = &["plot_path", "logo_path"];

/// Serialize the model, dropping values that only make sense on this machine
pub fn to_portable_json(model: &EnrichedModel) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(model)?;
    strip_local_paths(&mut value);
    serde_json::to_string_pretty(&value)
}

/// Remove local path entries at any depth
pub fn strip_local_paths(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in LOCAL_PATH_KEYS {
                map.remove(*key);
            }
            map.values_mut().for_each(strip_local_paths);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_local_paths),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_local_paths_nested() {
        let mut value = json!({
            "title": "Audit",
            "branding": {"logo_path": "/srv/logo.png", "company_name": "Acme"},
            "clustering": {"status": "clustered", "plot_path": "/tmp/clustering_analysis_1.png", "n_clusters": 2},
            "results": [{"plot_path": "/x"}]
        });
        strip_local_paths(&mut value);
        assert!(value["branding"].get("logo_path").is_none());
        assert_eq!(value["branding"]["company_name"], "Acme");
        assert!(value["clustering"].get("plot_path").is_none());
        assert_eq!(value["clustering"]["n_clusters"], 2);
        assert!(value["results"][0].get("plot_path").is_none());
    }
}
