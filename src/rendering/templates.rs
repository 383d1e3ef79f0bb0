//! Named HTML templates with `{{ dotted.path }}` placeholders

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while resolving or rendering a template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {name}")]
    NotFound { name: String },

    #[error("Failed to render template '{name}': {reason}")]
    Render { name: String, reason: String },
}

/// Resolves templates by name and renders them against a JSON context
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Loads `{name}.html` from a template directory
///
/// Placeholders look like `{{ summary.total_analyses }}`. Values are
/// HTML-escaped unless the placeholder ends in `| safe`. A placeholder that
/// does not resolve is a render error, so a stale template falls back to the
/// built-in layout instead of producing a half-filled page.
pub struct DirectoryTemplateEngine {
    template_dir: PathBuf,
    placeholder: Regex,
}

impl DirectoryTemplateEngine {
    pub fn new<P: AsRef<Path>>(template_dir: P) -> Result<Self> {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*(\|\s*safe\s*)?\}\}")
            .context("Failed to compile template placeholder pattern")?;

        Ok(Self {
            template_dir: template_dir.as_ref().to_path_buf(),
            placeholder,
        })
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Path a template name resolves to, if the name is acceptable
    pub fn template_path(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.template_dir.join(format!("{}.html", name)))
    }

    /// Substitute placeholders in `source`
    pub fn render_str(&self, name: &str, source: &str, context: &Value) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.placeholder.captures_iter(source) {
            let whole = caps.get(0).ok_or_else(|| TemplateError::Render {
                name: name.to_string(),
                reason: "malformed placeholder".to_string(),
            })?;
            output.push_str(&source[last..whole.start()]);
            output.push_str(&self.substitute(name, &caps, context)?);
            last = whole.end();
        }
        output.push_str(&source[last..]);

        Ok(output)
    }

    fn substitute(&self, name: &str, caps: &Captures<'_>, context: &Value) -> Result<String, TemplateError> {
        let path = caps.get(1).map_or("", |m| m.as_str());
        let safe = caps.get(2).is_some();

        let value = lookup(context, path).ok_or_else(|| TemplateError::Render {
            name: name.to_string(),
            reason: format!("undefined variable '{}'", path),
        })?;

        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        };

        Ok(if safe { text } else { escape_html(&text) })
    }
}

impl TemplateEngine for DirectoryTemplateEngine {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        let path = self
            .template_path(name)
            .filter(|p| p.is_file())
            .ok_or_else(|| TemplateError::NotFound { name: name.to_string() })?;

        let source = fs::read_to_string(&path).map_err(|e| TemplateError::Render {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        self.render_str(name, &source, context)
    }
}

/// Engine used when no template directory is configured
#[derive(Debug, Clone, Default)]
pub struct NullTemplateEngine;

impl TemplateEngine for NullTemplateEngine {
    fn render(&self, name: &str, _context: &Value) -> Result<String, TemplateError> {
        Err(TemplateError::NotFound { name: name.to_string() })
    }
}

/// Resolve a dotted path like `summary.common_issues.0.issue`
fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_context() -> Value {
        json!({
            "title": "Q3 <Audit>",
            "summary": {"total_analyses": 4, "common_issues": [{"issue": "consent", "count": 2}]},
            "subtitle": null,
            "fragments": {"results": "<div>cards</div>"}
        })
    }

    #[test]
    fn test_render_placeholders() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("audit.html"),
            "<h1>{{ title }}</h1><p>{{summary.total_analyses}} / {{ summary.common_issues.0.issue }}</p>{{ subtitle }}{{ fragments.results | safe }}",
        )
        .unwrap();

        let engine = DirectoryTemplateEngine::new(temp_dir.path()).unwrap();
        let html = engine.render("audit", &create_test_context()).unwrap();
        assert_eq!(
            html,
            "<h1>Q3 &lt;Audit&gt;</h1><p>4 / consent</p><div>cards</div>"
        );
    }

    #[test]
    fn test_missing_template() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DirectoryTemplateEngine::new(temp_dir.path()).unwrap();
        let err = engine.render("missing", &create_test_context()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DirectoryTemplateEngine::new(temp_dir.path()).unwrap();
        assert!(engine.template_path("../etc/passwd").is_none());
        assert!(engine.template_path("").is_none());
        assert!(engine.template_path("executive-summary_v2").is_some());
    }

    #[test]
    fn test_undefined_variable_is_render_error() {
        let temp_dir = TempDir::new().unwrap();
        let engine = DirectoryTemplateEngine::new(temp_dir.path()).unwrap();
        let err = engine
            .render_str("t", "{{ summary.missing }}", &create_test_context())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
        assert!(err.to_string().contains("summary.missing"));
    }

    #[test]
    fn test_null_engine() {
        let err = NullTemplateEngine.render("default", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a & "b" <c>"#), "a &amp; &quot;b&quot; &lt;c&gt;");
    }
}
