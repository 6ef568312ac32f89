//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::info;

use super::{ConfluenceClient, read_json};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

impl ConfluenceClient {
    /// Upload or update attachment (upsert by filename).
    pub(crate) fn upsert_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), ConfluenceError> {
        let existing = self.find_attachment_by_name(page_id, filename)?;

        let url = if let Some(ref att) = existing {
            info!(
                "Updating existing attachment '{}' (id={})",
                filename, att.id
            );
            format!(
                "{}/content/{}/child/attachment/{}/data",
                self.api_url(),
                page_id,
                att.id
            )
        } else {
            info!(
                "Uploading new attachment '{}' to page {}",
                filename, page_id
            );
            format!("{}/content/{}/child/attachment", self.api_url(), page_id)
        };

        let boundary = format!("----DocsyncFormBoundary{:016x}", rand::rng().random::<u64>());
        let body = multipart_body(&boundary, filename, content_type, data);

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        // Response shape differs between create and update; only the status matters
        let _: serde_json::Value = read_json(response)?;
        Ok(())
    }

    /// List attachments on a page.
    pub(crate) fn get_attachments(
        &self,
        page_id: &str,
    ) -> Result<AttachmentsResponse, ConfluenceError> {
        let url = format!(
            "{}/content/{}/child/attachment?limit=500",
            self.api_url(),
            page_id
        );

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }

    /// Find attachment by filename on a page.
    fn find_attachment_by_name(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        let attachments = self.get_attachments(page_id)?;
        Ok(attachments
            .results
            .into_iter()
            .find(|a| a.title == filename))
    }
}

/// Build a `multipart/form-data` body with a single `file` part.
fn multipart_body(boundary: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("XYZ", "diagram.png", "image/png", b"DATA");
        let text = String::from_utf8(body).unwrap();

        assert_eq!(
            text,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"diagram.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             DATA\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn test_multipart_body_binary_payload_preserved() {
        let data = [0x89, b'P', b'N', b'G', 0x00, 0xff];
        let body = multipart_body("B", "x.png", "image/png", &data);
        assert!(body.windows(data.len()).any(|w| w == data));
    }
}
