//! Chart embedding backends.
//!
//! A [`ChartEmbedder`] receives a parsed chart specification and a
//! [`MountPoint`] and owns everything visual from there on. The shipped
//! [`VegaHtmlEmbedder`] writes a standalone HTML document that loads
//! vega-embed and renders the specification into the mount `<div>`.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ChartConfig;
use crate::error::{AltairError, Result};

/// The render target owned by one renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// DOM id of the container element.
    pub element_id: String,
    /// Document holding the container.
    pub document: PathBuf,
}

impl MountPoint {
    /// Create a mount point.
    pub fn new(element_id: impl Into<String>, document: impl Into<PathBuf>) -> Self {
        Self {
            element_id: element_id.into(),
            document: document.into(),
        }
    }
}

/// A visualization library that renders chart specifications.
pub trait ChartEmbedder: Send + Sync {
    /// Render `spec` into `mount`, replacing whatever was rendered there before.
    ///
    /// # Errors
    ///
    /// Returns [`AltairError::Embed`] or an I/O error if rendering fails.
    fn embed(&self, mount: &MountPoint, spec: &Value) -> Result<()>;
}

/// Writes vega-embed HTML documents.
#[derive(Debug, Clone)]
pub struct VegaHtmlEmbedder {
    title: String,
    vega_version: String,
    vega_lite_version: String,
    vega_embed_version: String,
}

impl VegaHtmlEmbedder {
    /// Create an embedder using the CDN versions and title from `config`.
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            title: config.title.clone(),
            vega_version: config.vega_version.clone(),
            vega_lite_version: config.vega_lite_version.clone(),
            vega_embed_version: config.vega_embed_version.clone(),
        }
    }

    /// Build the HTML document for `spec` mounted at `element_id`.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `spec` cannot be serialized.
    pub fn to_html(&self, element_id: &str, spec: &Value) -> Result<String> {
        let spec_json = script_safe_json(spec)?;
        let id_attr = html_escape(element_id);
        let id_js = serde_json::to_string(&format!("#{element_id}"))?;
        Ok(format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head>\n\
             \x20 <meta charset=\"utf-8\">\n\
             \x20 <title>{title}</title>\n\
             \x20 <script src=\"https://cdn.jsdelivr.net/npm/vega@{vega}\"></script>\n\
             \x20 <script src=\"https://cdn.jsdelivr.net/npm/vega-lite@{lite}\"></script>\n\
             \x20 <script src=\"https://cdn.jsdelivr.net/npm/vega-embed@{embed}\"></script>\n\
             </head>\n\
             <body>\n\
             \x20 <div class=\"vega-embed\" id=\"{id_attr}\"></div>\n\
             \x20 <script>\n\
             \x20   vegaEmbed({id_js}, {spec_json});\n\
             \x20 </script>\n\
             </body>\n\
             </html>\n",
            title = html_escape(&self.title),
            vega = html_escape(&self.vega_version),
            lite = html_escape(&self.vega_lite_version),
            embed = html_escape(&self.vega_embed_version),
        ))
    }
}

impl ChartEmbedder for VegaHtmlEmbedder {
    fn embed(&self, mount: &MountPoint, spec: &Value) -> Result<()> {
        let html = self.to_html(&mount.element_id, spec)?;
        write_replacing(&mount.document, &html)?;
        tracing::debug!(document = %mount.document.display(), "chart document written");
        Ok(())
    }
}

/// Write `content` to a sibling temp file, then rename it over `path`.
fn write_replacing(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            AltairError::Embed(format!(
                "mount document has no file name: {}",
                path.display()
            ))
        })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize `spec` so it cannot terminate the surrounding `<script>` element.
fn script_safe_json(spec: &Value) -> Result<String> {
    Ok(serde_json::to_string(spec)?.replace("</", "<\\/"))
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    fn embedder() -> VegaHtmlEmbedder {
        VegaHtmlEmbedder::new(&ChartConfig::default())
    }

    #[test]
    fn html_loads_vega_and_mounts_spec() {
        let html = embedder()
            .to_html("vega-embed", &json!({ "mark": "bar" }))
            .unwrap();
        assert!(html.contains("https://cdn.jsdelivr.net/npm/vega@5"));
        assert!(html.contains("https://cdn.jsdelivr.net/npm/vega-lite@5"));
        assert!(html.contains("https://cdn.jsdelivr.net/npm/vega-embed@6"));
        assert!(html.contains("<div class=\"vega-embed\" id=\"vega-embed\"></div>"));
        assert!(html.contains(r##"vegaEmbed("#vega-embed", {"mark":"bar"});"##));
    }

    #[test]
    fn html_spec_cannot_close_script() {
        let html = embedder()
            .to_html("c", &json!({ "title": "</script><b>x</b>" }))
            .unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r"<\/script>"));
    }

    #[test]
    fn html_escapes_element_id_and_title() {
        let mut config = ChartConfig::default();
        config.title = "A & B".into();
        let html = VegaHtmlEmbedder::new(&config)
            .to_html("x\"y", &json!({}))
            .unwrap();
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("id=\"x&quot;y\""));
    }

    #[test]
    fn embed_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let mount = MountPoint::new("vega-embed", dir.path().join("out").join("chart.html"));
        let e = embedder();

        e.embed(&mount, &json!({ "mark": "bar" })).unwrap();
        e.embed(&mount, &json!({ "mark": "point" })).unwrap();

        let html = std::fs::read_to_string(&mount.document).unwrap();
        assert!(html.contains("\"point\""));
        assert!(!html.contains("\"bar\""));
        assert!(!dir.path().join("out").join("chart.html.tmp").exists());
    }

    #[test]
    fn html_escape_fn() {
        assert_eq!(
            html_escape("<a href=\"x\">&</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }
}
