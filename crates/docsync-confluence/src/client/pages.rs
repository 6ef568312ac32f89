//! Page operations for Confluence API.

use serde_json::json;
use tracing::{debug, info};

use super::{ConfluenceClient, encode_query, read_json};
use crate::error::ConfluenceError;
use crate::types::{Page, PagesResponse};

impl ConfluenceClient {
    /// Find page by exact title within a space.
    pub(crate) fn find_page(&self, space: &str, title: &str) -> Result<Option<Page>, ConfluenceError> {
        let url = format!(
            "{}/content?spaceKey={}&title={}&expand=version",
            self.api_url(),
            encode_query(space),
            encode_query(title)
        );

        debug!("Looking up page '{}' in space {}", title, space);

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        let pages: PagesResponse = read_json(response)?;
        Ok(pages.results.into_iter().find(|p| p.title == title))
    }

    /// Get page by ID with optional field expansion.
    pub(crate) fn get_page(&self, page_id: &str, expand: &[&str]) -> Result<Page, ConfluenceError> {
        let mut url = format!("{}/content/{}", self.api_url(), page_id);

        if !expand.is_empty() {
            url.push_str("?expand=");
            url.push_str(&expand.join(","));
        }

        debug!("Getting page {}", page_id);

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }

    /// Create page in a space as a child of `parent_id`.
    pub(crate) fn create_page_under(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content", self.api_url());

        let payload = json!({
            "type": "page",
            "title": title,
            "space": {"key": space},
            "ancestors": [{"id": parent_id}],
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            }
        });
        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Page = read_json(response)?;
        info!("Created page '{}' (id={}) under {}", page.title, page.id, parent_id);
        Ok(page)
    }

    /// Update existing page, writing `version + 1`.
    pub(crate) fn put_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);

        let payload = json!({
            "type": "page",
            "title": title,
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            },
            "version": {"number": version + 1}
        });

        info!(
            "Updating page {} from version {} to {}",
            page_id,
            version,
            version + 1
        );

        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        read_json(response)
    }
}
