//! Navigation-driven publishing of Markdown pages to Confluence.
//!
//! This crate mirrors a documentation tree into a wiki space in two phases:
//!
//! 1. [`PageHierarchySynchronizer`] walks the navigation tree and ensures a
//!    remote page exists for every node, producing a [`PageIdentityMap`].
//! 2. [`ContentTransformer`] converts each page's Markdown to storage markup,
//!    rewriting links through the map and replacing diagrams with images.
//!
//! [`Publisher`] runs both phases and updates the remote pages.
//!
//! # Example
//!
//! ```ignore
//! use docsync_publish::{PublishOptions, Publisher, PageNaming, scan_docs_dir};
//! use docsync_renderer::StorageRenderer;
//!
//! let nav = scan_docs_dir(Path::new("docs"))?;
//! let renderer = StorageRenderer::new();
//! let options = PublishOptions {
//!     space: "DOCS".to_owned(),
//!     parent_id: "12345".to_owned(),
//!     naming: PageNaming::default(),
//!     dry_run: false,
//! };
//! let report = Publisher::new(&client, &renderer, options).publish(&nav);
//! ```

mod anchors;
mod links;
mod macros;
mod markup;
mod nav;
mod publisher;
mod sync;
mod tables;
#[cfg(test)]
mod testing;
mod transform;

pub use anchors::{AnchorIndex, AnchorMap, baseline_anchor, extract_heading_anchors, target_anchor};
pub use links::LinkResolver;
pub use macros::{MACRO_REPLACEMENTS, replace_incompatible_macros};
pub use nav::{NavError, NavNode, NavPage, leaves, load_mkdocs_nav, scan_docs_dir};
pub use publisher::{PageReport, PageStatus, PublishOptions, PublishReport, Publisher};
pub use sync::{
    NodeOutcome, NodeStatus, PageHierarchySynchronizer, PageIdentityMap, PageNaming, SECTION_BODY,
    SyncReport,
};
pub use tables::normalize_indented_tables;
pub use transform::{ContentTransformer, TransformedPage};
