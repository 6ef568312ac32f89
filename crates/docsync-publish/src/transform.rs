//! Markdown to Confluence page body conversion.
//!
//! [`ContentTransformer`] runs the full pipeline for one page:
//!
//! 1. strip HTML comments
//! 2. dedent indented tables
//! 3. collect local image references as attachments
//! 4. render to storage markup
//! 5. rewrite links to synchronized pages
//! 6. replace diagram code blocks with rendered images
//! 7. replace code macro languages Confluence does not support
//!
//! No stage fails the page. Anything that cannot be resolved is left as it
//! was and reported as a warning.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docsync_diagrams::{DiagramLanguage, DiagramRasterizer};
use docsync_renderer::{MarkupRenderer, escape_html, is_remote_url};
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

use crate::anchors::AnchorIndex;
use crate::links::LinkResolver;
use crate::macros::replace_incompatible_macros;
use crate::nav::NavPage;
use crate::sync::PageIdentityMap;
use crate::tables::normalize_indented_tables;

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// A whole code macro: parameters in group 1, the CDATA sections of the body in group 2.
static CODE_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)<ac:structured-macro ac:name="code"[^>]*>"#,
        r"((?:<ac:parameter [^>]*>[^<]*</ac:parameter>)*)",
        r"<ac:plain-text-body>((?:<!\[CDATA\[.*?\]\]>)*)</ac:plain-text-body>",
        r"</ac:structured-macro>",
    ))
    .expect("valid regex")
});

static LANGUAGE_PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ac:parameter ac:name="language">([^<]*)</ac:parameter>"#).expect("valid regex")
});

/// Converted page body and the files it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedPage {
    /// Confluence storage markup.
    pub body: String,
    /// Images to upload as attachments, in discovery order.
    pub attachments: Vec<PathBuf>,
    /// Unresolved references and other non-fatal problems.
    pub warnings: Vec<String>,
}

/// Converts pages against a complete identity map and anchor index.
pub struct ContentTransformer<'a> {
    renderer: &'a dyn MarkupRenderer,
    links: LinkResolver<'a>,
    diagrams: Option<&'a DiagramRasterizer>,
}

impl<'a> ContentTransformer<'a> {
    /// Create a transformer. Diagrams stay code blocks until
    /// [`with_diagrams`](Self::with_diagrams) is called.
    pub fn new(
        renderer: &'a dyn MarkupRenderer,
        pages: &'a PageIdentityMap,
        anchors: &'a AnchorIndex,
    ) -> Self {
        Self {
            renderer,
            links: LinkResolver::new(pages, anchors),
            diagrams: None,
        }
    }

    /// Enable diagram rendering.
    #[must_use]
    pub fn with_diagrams(mut self, diagrams: &'a DiagramRasterizer) -> Self {
        self.diagrams = Some(diagrams);
        self
    }

    /// Convert one page's Markdown.
    pub fn transform(&self, markdown: &str, page: &NavPage) -> TransformedPage {
        let mut result = TransformedPage::default();

        let cleaned = HTML_COMMENT.replace_all(markdown, "");
        let cleaned = normalize_indented_tables(&cleaned);

        self.collect_images(&cleaned, page, &mut result);

        let content = self.renderer.render(&cleaned);
        let content = self
            .links
            .rewrite(&content, &page.src_path, &mut result.warnings);
        let content = self.convert_diagrams(&content, &page.src_path, &mut result);
        result.body = replace_incompatible_macros(&content);

        tracing::debug!(
            "Transformed {} ({} attachments, {} warnings)",
            page.src_path,
            result.attachments.len(),
            result.warnings.len()
        );
        result
    }

    /// Collect local images as the renderer parses them, so every
    /// `ri:attachment` it emits has a file or a warning.
    fn collect_images(&self, markdown: &str, page: &NavPage, result: &mut TransformedPage) {
        let page_dir = page.abs_src_path.parent().unwrap_or(Path::new("."));

        for source in self.renderer.image_sources(markdown) {
            if is_remote_url(&source) {
                continue;
            }
            let local = source.split(['?', '#']).next().unwrap_or(&source);
            let decoded = percent_decode_str(local).decode_utf8_lossy();
            let path = page_dir.join(decoded.as_ref());
            if path.is_file() {
                tracing::debug!("Added image to attachments: {}", path.display());
                result.attachments.push(path);
            } else {
                warn(
                    &mut result.warnings,
                    format!(
                        "Referenced image not found: {} (in {})",
                        path.display(),
                        page.src_path
                    ),
                );
            }
        }
    }

    fn convert_diagrams(
        &self,
        content: &str,
        src_path: &str,
        result: &mut TransformedPage,
    ) -> String {
        CODE_MACRO
            .replace_all(content, |caps: &Captures<'_>| {
                let original = caps[0].to_owned();

                let Some(language) = LANGUAGE_PARAMETER
                    .captures(&caps[1])
                    .and_then(|lang| DiagramLanguage::parse(&lang[1]))
                else {
                    return original;
                };
                let source = uncdata(&caps[2]);

                let Some(diagrams) = self.diagrams else {
                    warn(
                        &mut result.warnings,
                        format!(
                            "Diagram rendering disabled, keeping {} code block in {src_path}",
                            language.endpoint()
                        ),
                    );
                    return original;
                };

                match diagrams.try_render(language, source.trim()) {
                    Ok(path) => {
                        let filename = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        tracing::debug!(
                            "Converted {} code block to image {filename}",
                            language.endpoint()
                        );
                        result.attachments.push(path);
                        format!(
                            r#"<ac:image><ri:attachment ri:filename="{}" /></ac:image>"#,
                            escape_html(&filename)
                        )
                    }
                    Err(e) => {
                        warn(
                            &mut result.warnings,
                            format!(
                                "Failed to render {} diagram in {src_path}, keeping code block: {e}",
                                language.endpoint()
                            ),
                        );
                        original
                    }
                }
            })
            .into_owned()
    }
}

/// Log a warning and record it on the page result.
fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

/// Recover text from a run of CDATA sections, joining sections split around `]]>`.
fn uncdata(sections: &str) -> String {
    let inner = sections
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(sections);
    inner.replace("]]]]><![CDATA[>", "]]>")
}
