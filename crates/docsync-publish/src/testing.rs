//! In-memory wiki for tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use docsync_confluence::{ConfluenceError, PageIdentity, WikiClient};

/// Page stored by [`MemoryWiki`].
#[derive(Debug, Clone)]
pub(crate) struct StoredPage {
    pub id: String,
    pub title: String,
    pub parent_id: String,
    pub body: String,
    pub attachments: Vec<String>,
    pub updates: usize,
}

/// [`WikiClient`] keeping pages in memory, with failure injection by title.
#[derive(Debug, Default)]
pub(crate) struct MemoryWiki {
    pages: RwLock<Vec<StoredPage>>,
    created: RwLock<Vec<String>>,
    fail_create: HashSet<String>,
    fail_lookup: HashSet<String>,
    fail_update: HashSet<String>,
}

impl MemoryWiki {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_page` fail for this title.
    #[must_use]
    pub fn fail_create(mut self, title: &str) -> Self {
        self.fail_create.insert(title.to_owned());
        self
    }

    /// Make `find_page_by_title` fail for this title.
    #[must_use]
    pub fn fail_lookup(mut self, title: &str) -> Self {
        self.fail_lookup.insert(title.to_owned());
        self
    }

    /// Make `update_page` fail for the page with this title.
    #[must_use]
    pub fn fail_update(mut self, title: &str) -> Self {
        self.fail_update.insert(title.to_owned());
        self
    }

    /// Insert an existing page, returning its id.
    pub fn seed(&self, title: &str, parent_id: &str, body: &str) -> String {
        self.insert(title, parent_id, body)
    }

    /// Titles passed to successful `create_page` calls, in call order.
    pub fn created_titles(&self) -> Vec<String> {
        self.created.read().unwrap().clone()
    }

    pub fn page_by_title(&self, title: &str) -> Option<StoredPage> {
        self.pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.title == title)
            .cloned()
    }

    pub fn page_count(&self) -> usize {
        self.pages.read().unwrap().len()
    }

    fn insert(&self, title: &str, parent_id: &str, body: &str) -> String {
        let mut pages = self.pages.write().unwrap();
        let id = (1000 + pages.len()).to_string();
        pages.push(StoredPage {
            id: id.clone(),
            title: title.to_owned(),
            parent_id: parent_id.to_owned(),
            body: body.to_owned(),
            attachments: Vec::new(),
            updates: 0,
        });
        id
    }
}

fn rejected(status: u16, message: &str) -> ConfluenceError {
    ConfluenceError::HttpResponse {
        status,
        body: message.to_owned(),
    }
}

impl WikiClient for MemoryWiki {
    fn find_page_by_title(
        &self,
        _space: &str,
        title: &str,
    ) -> Result<Option<PageIdentity>, ConfluenceError> {
        if self.fail_lookup.contains(title) {
            return Err(rejected(500, "search unavailable"));
        }
        Ok(self.page_by_title(title).map(|p| PageIdentity {
            id: p.id,
            title: p.title,
        }))
    }

    fn create_page(
        &self,
        _space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> Result<PageIdentity, ConfluenceError> {
        if self.fail_create.contains(title) {
            return Err(rejected(400, "title rejected"));
        }
        let id = self.insert(title, parent_id, body);
        self.created.write().unwrap().push(title.to_owned());
        Ok(PageIdentity {
            id,
            title: title.to_owned(),
        })
    }

    fn update_page(&self, id: &str, body: &str, title: &str) -> Result<(), ConfluenceError> {
        if self.fail_update.contains(title) {
            return Err(rejected(409, "version conflict"));
        }
        let mut pages = self.pages.write().unwrap();
        let page = pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| rejected(404, "no such page"))?;
        page.body = body.to_owned();
        page.title = title.to_owned();
        page.updates += 1;
        Ok(())
    }

    fn upload_attachment(&self, page_id: &str, path: &Path) -> Result<(), ConfluenceError> {
        std::fs::metadata(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut pages = self.pages.write().unwrap();
        let page = pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or_else(|| rejected(404, "no such page"))?;
        page.attachments.push(filename);
        Ok(())
    }
}
