//! Storage format renderer built on `pulldown-cmark` events.

use pulldown_cmark::{
    BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
};

use crate::MarkupRenderer;
use crate::url::{attachment_filename, is_remote_url};
use crate::state::{CodeBlockState, PendingImage, TableState, cdata, escape_html};

/// Markdown renderer producing Confluence XHTML storage format.
///
/// Produces:
/// - `ac:structured-macro` `code` for code blocks (language as a parameter)
/// - `info`/`tip`/`note`/`warning` macros for blockquotes and GFM alerts
/// - `ac:image` with `ri:url` or `ri:attachment` for images
/// - plain `<a href>` links, left for the link resolver to rewrite
pub struct StorageRenderer {
    gfm: bool,
}

impl StorageRenderer {
    /// Create a renderer with GFM extensions enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { gfm: true }
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default: tables, strikethrough, task lists and alerts.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }
}

impl Default for StorageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupRenderer for StorageRenderer {
    fn render(&self, markdown: &str) -> String {
        let mut pass = RenderPass::default();
        for event in Parser::new_ext(markdown, self.parser_options()) {
            pass.process_event(event);
        }
        pass.output
    }

    fn image_sources(&self, markdown: &str) -> Vec<String> {
        Parser::new_ext(markdown, self.parser_options())
            .filter_map(|event| match event {
                Event::Start(Tag::Image { dest_url, .. }) => Some(dest_url.into_string()),
                _ => None,
            })
            .collect()
    }
}

/// Mutable state for a single `render` call.
#[derive(Default)]
struct RenderPass {
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: Option<PendingImage>,
}

impl RenderPass {
    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.push_inline(&format!("<code>{}</code>", escape_html(&code)));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => {
                if let Some(image) = &mut self.image {
                    image.alt.push(' ');
                } else {
                    self.output.push('\n');
                }
            }
            Event::HardBreak => self.push_inline("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.output.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                self.output
                    .push_str(&format!("<h{}>", heading_level_to_num(level)));
            }
            Tag::BlockQuote(kind) => {
                self.output.push_str(&format!(
                    r#"<ac:structured-macro ac:name="{}" ac:schema-version="1"><ac:rich-text-body>"#,
                    panel_macro(kind)
                ));
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
            }
            Tag::List(Some(1)) => self.output.push_str("<ol>"),
            Tag::List(Some(start)) => self.output.push_str(&format!(r#"<ol start="{start}">"#)),
            Tag::List(None) => self.output.push_str("<ul>"),
            Tag::Item => self.output.push_str("<li>"),
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.table.is_in_head() { "th" } else { "td" };
                self.output.push_str(&format!(
                    "<{cell}{}>",
                    self.table.current_alignment_style()
                ));
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => {
                let href = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.to_string()
                };
                self.push_inline(&format!(r#"<a href="{}">"#, escape_html(&href)));
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                self.output
                    .push_str(&format!("</h{}>", heading_level_to_num(level)));
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</ac:rich-text-body></ac:structured-macro>"),
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                self.code_block(lang.as_deref(), &content);
            }
            TagEnd::List(ordered) => self.output.push_str(if ordered { "</ol>" } else { "</ul>" }),
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.table.is_in_head() { "</th>" } else { "</td>" });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.image_tag(&image);
                }
            }
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            self.output.push_str(&escape_html(text));
        }
    }

    /// Push inline markup, dropping it while collecting image alt text.
    fn push_inline(&mut self, content: &str) {
        if self.image.is_none() {
            self.output.push_str(content);
        }
    }

    fn code_block(&mut self, lang: Option<&str>, content: &str) {
        let content = content.strip_suffix('\n').unwrap_or(content);
        self.output
            .push_str(r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#);
        if let Some(lang) = lang {
            self.output.push_str(&format!(
                r#"<ac:parameter ac:name="language">{}</ac:parameter>"#,
                escape_html(lang)
            ));
        }
        self.output
            .push_str(r#"<ac:parameter ac:name="linenumbers">true</ac:parameter>"#);
        self.output.push_str(&format!(
            "<ac:plain-text-body>{}</ac:plain-text-body>",
            cdata(content)
        ));
        self.output.push_str("</ac:structured-macro>");
    }

    fn image_tag(&mut self, image: &PendingImage) {

        let mut attrs = String::new();
        if !image.alt.is_empty() {
            attrs.push_str(&format!(r#" ac:alt="{}""#, escape_html(&image.alt)));
        }
        if !image.title.is_empty() {
            attrs.push_str(&format!(r#" ac:title="{}""#, escape_html(&image.title)));
        }
        let inner = if is_remote_url(&image.src) {
            format!(r#"<ri:url ri:value="{}" />"#, escape_html(&image.src))
        } else {
            // Local file, uploaded as an attachment under its file name
            format!(
                r#"<ri:attachment ri:filename="{}" />"#,
                escape_html(&attachment_filename(&image.src))
            )
        };
        self.output
            .push_str(&format!("<ac:image{attrs}>{inner}</ac:image>"));
    }
}

/// Confluence panel macro used for a blockquote.
fn panel_macro(kind: Option<BlockQuoteKind>) -> &'static str {
    match kind {
        None | Some(BlockQuoteKind::Note | BlockQuoteKind::Important) => "info",
        Some(BlockQuoteKind::Tip) => "tip",
        Some(BlockQuoteKind::Warning) => "note",
        Some(BlockQuoteKind::Caution) => "warning",
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
