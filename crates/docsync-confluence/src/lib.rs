//! Confluence integration for docsync.
//!
//! The publishing pipeline talks to the wiki only through [`WikiClient`], so
//! it never depends on a concrete transport. [`ConfluenceClient`] implements
//! the trait over the Confluence Server/Data Center REST API.

mod client;
mod error;
pub mod types;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use client::{ConfluenceClient, Credentials};
pub use error::ConfluenceError;

/// Remote page as seen by the pipeline: its id and display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIdentity {
    /// Remote page id.
    pub id: String,
    /// Display title (prefix and suffix applied).
    pub title: String,
}

/// Remote wiki operations used by synchronization and publishing.
pub trait WikiClient: Send + Sync {
    /// Look up a page by exact title within a space.
    fn find_page_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<PageIdentity>, ConfluenceError>;

    /// Create a page under `parent_id`.
    fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> Result<PageIdentity, ConfluenceError>;

    /// Replace the body and title of an existing page.
    fn update_page(&self, id: &str, body: &str, title: &str) -> Result<(), ConfluenceError>;

    /// Upload a file as an attachment, replacing one with the same file name.
    fn upload_attachment(&self, page_id: &str, path: &Path) -> Result<(), ConfluenceError>;
}
