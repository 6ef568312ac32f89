//! Confluence API types.

mod attachment;
mod page;

pub use attachment::{Attachment, AttachmentsResponse};
pub use page::{Links, Page, PagesResponse, Version};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_search_response() {
        let json = r#"{
            "results": [{
                "id": "123",
                "type": "page",
                "title": "Getting Started",
                "version": {"number": 4},
                "_links": {"webui": "/display/DOCS/Getting+Started"}
            }],
            "size": 1
        }"#;

        let response: PagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.size, 1);
        let page = &response.results[0];
        assert_eq!(page.id, "123");
        assert_eq!(page.title, "Getting Started");
        assert_eq!(page.version.as_ref().map(|v| v.number), Some(4));
        assert_eq!(
            page.links.as_ref().and_then(|l| l.webui.as_deref()),
            Some("/display/DOCS/Getting+Started")
        );
    }

    #[test]
    fn test_deserialize_page_without_version() {
        let json = r#"{"id": "7", "type": "page", "title": "Created"}"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert!(page.version.is_none());
        assert!(page.links.is_none());
    }

    #[test]
    fn test_deserialize_attachments_response() {
        let json = r#"{"results": [{"id": "att1", "title": "diagram.png", "type": "attachment"}]}"#;
        let response: AttachmentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results[0].title, "diagram.png");
    }
}
