//! Built-in HTML layout used when no template can be rendered
//!
//! Every section tolerates missing data; this layout is the last resort and
//! always produces a complete document.

use std::fmt::Write as _;
use tracing::debug;

use crate::analysis::ClusteringOutcome;
use crate::rendering::model::{image_data_uri, EnrichedModel, ProcessedResult};
use crate::rendering::templates::escape_html;

/// Border color for a result card's status bucket
pub fn status_color(status_class: &str) -> &'static str {
    match status_class {
        "compliant" => "#28a745",
        "partial" => "#ffc107",
        "non-compliant" => "#dc3545",
        _ => "#6c757d",
    }
}

/// Render the full fallback document
pub fn render_fallback_html(model: &EnrichedModel) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        {header}
        {summary}
        {clustering}
        {results}
        {sections}
        {footer}
    </div>
</body>
</html>
"#,
        title = escape_html(&model.title),
        css = stylesheet(model),
        header = header(model),
        summary = summary_cards(model),
        clustering = clustering_section(model),
        results = results_section(model),
        sections = custom_sections(model),
        footer = footer(model),
    )
}

/// Base stylesheet derived from branding, plus any custom CSS
pub fn stylesheet(model: &EnrichedModel) -> String {
    let branding = &model.branding;
    let mut css = format!(
        r#"
@page {{ size: {page} {orientation}; margin: 2cm; }}
body {{ font-family: {font}; color: #222; margin: 0; }}
.container {{ max-width: 1100px; margin: 0 auto; padding: 24px; }}
.header {{ border-bottom: 3px solid {primary}; margin-bottom: 24px; }}
.header h1 {{ color: {primary}; margin-bottom: 4px; }}
.header .subtitle {{ color: {secondary}; font-size: 1.2em; }}
.meta {{ color: #555; font-size: 0.9em; }}
.logo {{ max-height: 64px; float: right; }}
.stats {{ display: flex; flex-wrap: wrap; gap: 12px; margin: 16px 0; }}
.stat-card {{ flex: 1; min-width: 160px; border: 1px solid #ddd; border-top: 4px solid {secondary}; padding: 12px; }}
.stat-card .value {{ font-size: 1.6em; font-weight: bold; color: {primary}; }}
.result-card {{ border: 1px solid #ddd; border-left: 6px solid #6c757d; padding: 12px; margin: 12px 0; page-break-inside: avoid; }}
.cluster {{ border-left: 4px solid {accent}; padding-left: 12px; margin: 8px 0; }}
.clustering img {{ max-width: 100%; }}
.footer {{ margin-top: 32px; color: #777; font-size: 0.8em; }}
"#,
        page = model.config.page_size.css_name(),
        orientation = match model.config.orientation {
            crate::models::Orientation::Portrait => "portrait",
            crate::models::Orientation::Landscape => "landscape",
        },
        font = branding.font_family,
        primary = branding.primary_color,
        secondary = branding.secondary_color,
        accent = branding.accent_color,
    );
    if let Some(custom) = &model.config.custom_css {
        css.push_str(custom);
        css.push('\n');
    }
    css
}

fn header(model: &EnrichedModel) -> String {
    let mut html = String::from(r#"<div class="header">"#);
    if let Some(logo) = &model.branding.logo_data_uri {
        let _ = write!(html, r#"<img class="logo" src="{}" alt="logo">"#, logo);
    }
    let _ = write!(html, "<h1>{}</h1>", escape_html(&model.title));
    if let Some(subtitle) = &model.subtitle {
        let _ = write!(html, r#"<div class="subtitle">{}</div>"#, escape_html(subtitle));
    }
    let _ = write!(
        html,
        r#"<p class="meta">Generated: {}"#,
        model.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(author) = &model.author {
        let _ = write!(html, " | Author: {}", escape_html(author));
    }
    if let Some(organization) = &model.organization {
        let _ = write!(html, " | Organization: {}", escape_html(organization));
    }
    html.push_str("</p></div>");
    html
}

/// Summary statistic cards
pub fn summary_cards(model: &EnrichedModel) -> String {
    let summary = &model.summary;
    let mut html = String::from(r#"<section class="summary"><h2>Summary</h2><div class="stats">"#);
    let cards = [
        ("Total Analyses", summary.total_analyses.to_string()),
        ("Average Compliance", format!("{:.1}%", summary.avg_compliance_score * 100.0)),
        ("Total Issues", summary.total_issues.to_string()),
        ("Avg Processing Time", format!("{:.1}s", summary.avg_processing_time)),
    ];
    for (label, value) in cards {
        let _ = write!(
            html,
            r#"<div class="stat-card"><div class="value">{}</div><div class="label">{}</div></div>"#,
            value, label
        );
    }
    html.push_str("</div>");

    if !summary.compliance_distribution.is_empty() {
        html.push_str("<h3>Compliance Distribution</h3><ul>");
        for (status, count) in &summary.compliance_distribution {
            let _ = write!(html, "<li>{}: {}</li>", escape_html(status), count);
        }
        html.push_str("</ul>");
    }

    if !summary.common_issues.is_empty() {
        html.push_str("<h3>Most Common Issues</h3><ol>");
        for issue in &summary.common_issues {
            let _ = write!(html, "<li>{} ({})</li>", escape_html(&issue.issue), issue.count);
        }
        html.push_str("</ol>");
    }

    html.push_str("</section>");
    html
}

/// Clustering overview with the inline scatter plot
pub fn clustering_section(model: &EnrichedModel) -> String {
    let payload = match &model.clustering {
        Some(ClusteringOutcome::Clustered(payload)) => payload,
        Some(ClusteringOutcome::InsufficientData { message, .. }) => {
            return format!(
                r#"<section class="clustering"><h2>Clustering Analysis</h2><p>{}</p></section>"#,
                escape_html(message)
            );
        }
        _ => return String::new(),
    };

    let mut html = String::from(r#"<section class="clustering"><h2>Clustering Analysis</h2>"#);
    if let Some(path) = &payload.plot_path {
        match image_data_uri(path) {
            Ok(uri) => {
                let _ = write!(html, r#"<img src="{}" alt="Clustering scatter plot">"#, uri);
            }
            Err(e) => debug!(path = %path.display(), error = %e, "Clustering image not embedded"),
        }
    }
    if payload.explained_variance_ratio.len() >= 2 {
        let _ = write!(
            html,
            "<p>Explained variance: {:.1}% / {:.1}%</p>",
            payload.explained_variance_ratio[0] * 100.0,
            payload.explained_variance_ratio[1] * 100.0
        );
    }
    for cluster in &payload.clusters {
        let _ = write!(
            html,
            r#"<div class="cluster"><h3>Cluster {} ({} protocols)</h3><p>{}</p><p>Avg compliance {:.2}, avg confidence {:.2}, avg issues {:.1}</p><p class="meta">{}</p></div>"#,
            cluster.cluster_id + 1,
            cluster.size,
            escape_html(&cluster.description),
            cluster.avg_compliance_score,
            cluster.avg_confidence_score,
            cluster.avg_issue_count,
            escape_html(&cluster.members.join(", ")),
        );
    }
    html.push_str("</section>");
    html
}

fn result_card(result: &ProcessedResult) -> String {
    let mut html = format!(
        r#"<div class="result-card" style="border-left-color: {color}"><h3>{label}</h3><p>Status: <strong>{status}</strong> | Score: {score:.1}% | Confidence: {confidence:.1}% | Issues: {issues} | Processing: {time:.1}s</p>"#,
        color = status_color(&result.status_class),
        label = escape_html(&result.label),
        status = escape_html(&result.compliance_status),
        score = result.compliance_score * 100.0,
        confidence = result.confidence_score * 100.0,
        issues = result.issue_count,
        time = result.processing_time,
    );
    for (heading, items) in [
        ("Issues", &result.issues),
        ("Recommendations", &result.recommendations),
        ("Similar Sections", &result.similar_sections),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = write!(html, "<h4>{}</h4><ul>", heading);
        for item in items {
            let _ = write!(html, "<li>{}</li>", escape_html(item));
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");
    html
}

/// One card per analysis result
pub fn results_section(model: &EnrichedModel) -> String {
    if model.results.is_empty() {
        return String::new();
    }
    let mut html = String::from(r#"<section class="results"><h2>Analysis Results</h2>"#);
    for result in &model.results {
        html.push_str(&result_card(result));
    }
    html.push_str("</section>");
    html
}

/// Caller-supplied sections
pub fn custom_sections(model: &EnrichedModel) -> String {
    model
        .custom_sections
        .iter()
        .map(|section| {
            format!(
                "<section><h2>{}</h2><p>{}</p></section>",
                escape_html(&section.title),
                escape_html(&section.content)
            )
        })
        .collect()
}

fn footer(model: &EnrichedModel) -> String {
    format!(
        r#"<div class="footer">{} | Report {} | Rendered {}</div>"#,
        escape_html(&model.branding.company_name),
        escape_html(&model.report_id),
        model.current_time.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ClusterStats, ClusteringPayload, SummaryStats};
    use crate::models::{AnalysisResult, Branding, ReportConfig, ReportData, ReportSection};
    use crate::rendering::model::resolve_branding;
    use tempfile::TempDir;

    fn create_test_model(data: ReportData, clustering: Option<ClusteringOutcome>) -> EnrichedModel {
        let config = ReportConfig::default();
        EnrichedModel::build(
            "report_42",
            &data,
            &config,
            SummaryStats::default(),
            clustering,
            resolve_branding(&Branding::default(), &config),
        )
    }

    #[test]
    fn test_minimal_model_renders() {
        let mut data = ReportData::new("Site Audit <2024>", vec![]);
        data.author = Some("J. Rivera".to_string());
        let html = render_fallback_html(&create_test_model(data, None));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("Site Audit &lt;2024&gt;"));
        assert!(html.contains("J. Rivera"));
        assert!(!html.contains("Clustering Analysis"));
    }

    #[test]
    fn test_result_cards_and_sections() {
        let mut data = ReportData::new("Audit", vec![AnalysisResult::default()]);
        data.custom_sections = vec![ReportSection {
            title: "Scope".to_string(),
            content: "All active trials".to_string(),
        }];
        let html = render_fallback_html(&create_test_model(data, None));
        assert!(html.contains("Protocol 1"));
        assert!(html.contains(status_color("unknown")));
        assert!(html.contains("All active trials"));
    }

    #[test]
    fn test_clustering_image_is_inlined() {
        let temp_dir = TempDir::new().unwrap();
        let plot = temp_dir.path().join("clustering_analysis_1.png");
        std::fs::write(&plot, [0x89, b'P', b'N', b'G']).unwrap();

        let payload = ClusteringPayload {
            n_clusters: 1,
            clusters: vec![ClusterStats {
                cluster_id: 0,
                size: 2,
                members: vec!["A".to_string(), "B".to_string()],
                avg_compliance_score: 0.9,
                avg_confidence_score: 0.8,
                avg_issue_count: 1.0,
                avg_processing_time: 2.0,
                characteristics: vec!["High compliance scores".to_string()],
                description: "High compliance scores".to_string(),
            }],
            plot_path: Some(plot),
            explained_variance_ratio: vec![0.7, 0.2],
            ..Default::default()
        };
        let html = clustering_section(&create_test_model(
            ReportData::default(),
            Some(ClusteringOutcome::Clustered(payload)),
        ));
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("Cluster 1 (2 protocols)"));
        assert!(html.contains("70.0% / 20.0%"));
    }

    #[test]
    fn test_insufficient_data_message() {
        let outcome = ClusteringOutcome::InsufficientData {
            feature_count: 1,
            message: "Insufficient data for clustering analysis".to_string(),
        };
        let html = clustering_section(&create_test_model(ReportData::default(), Some(outcome)));
        assert!(html.contains("Insufficient data"));
    }

    #[test]
    fn test_custom_css_is_appended() {
        let mut model = create_test_model(ReportData::default(), None);
        model.config.custom_css = Some(".result-card { color: red; }".to_string());
        assert!(stylesheet(&model).contains(".result-card { color: red; }"));
    }
}
