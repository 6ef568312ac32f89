//! Markdown to Confluence storage format renderer.
//!
//! This crate provides the baseline conversion used by the publishing pipeline:
//! - [`MarkupRenderer`]: pure `markdown -> storage markup` seam
//! - [`StorageRenderer`]: `pulldown-cmark` based implementation
//!
//! The output keeps relative links as plain `<a href>` elements and code blocks
//! as `code` structured macros, so later pipeline stages can rewrite them.
//!
//! # Example
//!
//! ```
//! use docsync_renderer::{MarkupRenderer, StorageRenderer};
//!
//! let renderer = StorageRenderer::new();
//! let xhtml = renderer.render("**Bold** text");
//! assert_eq!(xhtml, "<p><strong>Bold</strong> text</p>");
//! ```

mod renderer;
mod state;
mod url;

pub use renderer::StorageRenderer;
pub use state::escape_html;
pub use url::{attachment_filename, is_remote_url};

/// Converts one Markdown document into storage markup.
///
/// Implementations must be pure: the same input always yields the same output
/// and no failure is surfaced to the caller.
pub trait MarkupRenderer: Send + Sync {
    /// Render Markdown text to storage markup.
    fn render(&self, markdown: &str) -> String;

    /// Image destinations as parsed by [`render`](Self::render), in document order.
    fn image_sources(&self, markdown: &str) -> Vec<String>;
}
