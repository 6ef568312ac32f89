//! Diagram rasterization for docsync.
//!
//! This crate turns diagram code blocks into image files that can be uploaded
//! as page attachments:
//! - [`DiagramLanguage`]: which code block languages are diagrams
//! - [`Rasterizer`] / [`KrokiRasterizer`]: external renderer seam and its Kroki implementation
//! - [`ImageCache`] / [`DirImageCache`]: content-addressed image storage
//! - [`DiagramRasterizer`]: ties them together, rendering each source at most once
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use docsync_diagrams::{DiagramLanguage, DiagramRasterizer, DirImageCache, KrokiRasterizer};
//!
//! let rasterizer = DiagramRasterizer::new(
//!     Box::new(KrokiRasterizer::new("https://kroki.io")),
//!     Box::new(DirImageCache::new(PathBuf::from(".docsync/diagrams"), "1")),
//! );
//! let image = rasterizer.render(DiagramLanguage::Mermaid, "graph TD\n  A --> B");
//! ```

mod cache;
mod consts;
mod kroki;
mod language;
mod rasterizer;

pub use cache::{DiagramKey, DirImageCache, ImageCache};
pub use kroki::{KrokiRasterizer, RasterizeError, Rasterizer};
pub use language::DiagramLanguage;
pub use rasterizer::DiagramRasterizer;
