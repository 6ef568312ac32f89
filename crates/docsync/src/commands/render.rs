//! `docsync render` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::Term;
use docsync_config::{CliSettings, Config};
use docsync_publish::{
    AnchorIndex, ContentTransformer, NavPage, PageIdentityMap, extract_heading_anchors,
};
use docsync_renderer::StorageRenderer;

use super::{create_diagram_rasterizer, read_map};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover docsync.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page identity map written by `publish --map-out` or `sync --map-out`.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long)]
    kroki_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file, map or configuration cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            kroki_url: self.kroki_url.clone(),
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let docs_dir = &config.docs_resolved.source_dir;

        let markdown = fs::read_to_string(&self.file)?;
        let map = match &self.map {
            Some(path) => read_map(path)?,
            None => PageIdentityMap::new(),
        };

        let page = NavPage {
            title: String::new(),
            src_path: relative_src_path(&self.file, docs_dir),
            abs_src_path: self.file.clone(),
        };
        let anchors = build_anchor_index(&map, docs_dir, &page, &markdown);

        let renderer = StorageRenderer::new();
        let diagrams = create_diagram_rasterizer(&config.diagrams_resolved);
        let mut transformer = ContentTransformer::new(&renderer, &map, &anchors);
        if let Some(diagrams) = &diagrams {
            transformer = transformer.with_diagrams(diagrams);
        }
        let result = transformer.transform(&markdown, &page);

        Term::stdout().write_line(&result.body)?;

        for attachment in &result.attachments {
            output.detail(&format!("Attachment: {}", attachment.display()));
        }
        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        Ok(())
    }
}

/// Source path of `file` relative to the docs directory, falling back to its file name.
fn relative_src_path(file: &Path, docs_dir: &Path) -> String {
    let file = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    let docs_dir = fs::canonicalize(docs_dir).unwrap_or_else(|_| docs_dir.to_path_buf());
    let relative = file
        .strip_prefix(&docs_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.file_name().map(PathBuf::from).unwrap_or_default());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Anchor maps for the rendered page and every mapped page readable under the docs directory.
fn build_anchor_index(
    map: &PageIdentityMap,
    docs_dir: &Path,
    page: &NavPage,
    markdown: &str,
) -> AnchorIndex {
    let mut anchors: AnchorIndex = map
        .keys()
        .filter_map(|src_path| {
            let content = fs::read_to_string(docs_dir.join(src_path)).ok()?;
            Some((src_path.clone(), extract_heading_anchors(&content)))
        })
        .collect();
    anchors.insert(page.src_path.clone(), extract_heading_anchors(markdown));
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use docsync_confluence::PageIdentity;

    #[test]
    fn test_relative_src_path_inside_docs() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(docs.join("guide")).unwrap();
        fs::write(docs.join("guide/setup.md"), "# Setup\n").unwrap();

        assert_eq!(
            relative_src_path(&docs.join("guide/setup.md"), &docs),
            "guide/setup.md"
        );
    }

    #[test]
    fn test_relative_src_path_outside_docs() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(tmp.path().join("notes.md"), "# Notes\n").unwrap();

        assert_eq!(relative_src_path(&tmp.path().join("notes.md"), &docs), "notes.md");
    }

    #[test]
    fn test_anchor_index_reads_mapped_pages() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path();
        fs::write(docs.join("other.md"), "# Other\n\n## Grafana (visualizations)\n").unwrap();
        let mut map = PageIdentityMap::new();
        for src_path in ["other.md", "missing.md"] {
            map.insert(
                src_path.to_owned(),
                PageIdentity {
                    id: "1".to_owned(),
                    title: src_path.to_owned(),
                },
            );
        }
        let page = NavPage {
            title: String::new(),
            src_path: "index.md".to_owned(),
            abs_src_path: docs.join("index.md"),
        };

        let anchors = build_anchor_index(&map, docs, &page, "# Index\n");

        assert_eq!(anchors.len(), 2);
        assert_eq!(
            anchors["other.md"]["grafana-visualizations"],
            "Grafana-(visualizations)"
        );
        assert_eq!(anchors["index.md"]["index"], "Index");
    }
}
