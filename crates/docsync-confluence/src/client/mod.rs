//! Confluence REST API client.
//!
//! Provides sync HTTP client for Confluence Server/Data Center REST API
//! with bearer (personal access token) or basic authentication.

mod attachments;
mod pages;

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::Response;

use crate::error::ConfluenceError;
use crate::{PageIdentity, WikiClient};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Query component characters left unescaped (RFC 3986 unreserved).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Authentication credentials.
#[derive(Clone)]
pub enum Credentials {
    /// Personal access token sent as `Authorization: Bearer`.
    Bearer(String),
    /// Username and API token sent as `Authorization: Basic`.
    Basic {
        /// Account name.
        username: String,
        /// API token or password.
        token: String,
    },
}

impl Credentials {
    /// `Authorization` header value.
    fn header_value(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic { username, token } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{token}")))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

impl ConfluenceClient {
    /// Create client for a Confluence server.
    ///
    /// # Arguments
    /// * `base_url` - Confluence server base URL
    /// * `credentials` - Authentication credentials
    #[must_use]
    pub fn new(base_url: &str, credentials: &Credentials) -> Self {
        Self::with_timeout(base_url, credentials, Duration::from_secs(DEFAULT_TIMEOUT))
    }

    /// Create client with a custom global request timeout.
    #[must_use]
    pub fn with_timeout(base_url: &str, credentials: &Credentials, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_header: credentials.header_value(),
        }
    }

    /// Server base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }
}

impl WikiClient for ConfluenceClient {
    fn find_page_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<PageIdentity>, ConfluenceError> {
        Ok(self
            .find_page(space, title)?
            .map(|page| PageIdentity {
                id: page.id,
                title: page.title,
            }))
    }

    fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: &str,
    ) -> Result<PageIdentity, ConfluenceError> {
        let page = self.create_page_under(space, title, body, parent_id)?;
        Ok(PageIdentity {
            id: page.id,
            title: page.title,
        })
    }

    fn update_page(&self, id: &str, body: &str, title: &str) -> Result<(), ConfluenceError> {
        let current = self.get_page(id, &["version"])?;
        let version = current.version.map_or(0, |v| v.number);
        self.put_page(id, title, body, version)?;
        Ok(())
    }

    fn upload_attachment(&self, page_id: &str, path: &Path) -> Result<(), ConfluenceError> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("attachment path has no file name: {}", path.display()),
                )
            })?;
        self.upsert_attachment(page_id, &filename, &data, content_type_for(&filename))?;
        Ok(())
    }
}

/// Percent-encode a query parameter value.
fn encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

/// Read a JSON response body, mapping error statuses to [`ConfluenceError::HttpResponse`].
fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body_reader = response.into_body();

    if status >= 400 {
        let error_body = body_reader
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(ConfluenceError::HttpResponse {
            status,
            body: error_body,
        });
    }

    let text = body_reader.read_to_string()?;
    Ok(serde_json::from_str(&text)?)
}

/// MIME type for an attachment file name.
fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bearer_header() {
        let creds = Credentials::Bearer("secret".to_owned());
        assert_eq!(creds.header_value(), "Bearer secret");
    }

    #[test]
    fn test_basic_header() {
        let creds = Credentials::Basic {
            username: "bot".to_owned(),
            token: "pw".to_owned(),
        };
        // base64("bot:pw")
        assert_eq!(creds.header_value(), "Basic Ym90OnB3");
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = Credentials::Basic {
            username: "bot".to_owned(),
            token: "hunter2".to_owned(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("bot"));
        assert!(!debug.contains("hunter2"));
        assert!(!format!("{:?}", Credentials::Bearer("hunter2".to_owned())).contains("hunter2"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ConfluenceClient::new(
            "https://wiki.example.com/",
            &Credentials::Bearer("t".to_owned()),
        );
        assert_eq!(client.base_url(), "https://wiki.example.com");
        assert_eq!(client.api_url(), "https://wiki.example.com/rest/api");
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("Getting Started"), "Getting%20Started");
        assert_eq!(encode_query("A&B=C"), "A%26B%3DC");
        assert_eq!(encode_query("v1.0_draft-x~"), "v1.0_draft-x~");
        assert_eq!(encode_query("Über"), "%C3%9Cber");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("diagram_abc.png"), "image/png");
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_upload_missing_file_is_io_error() {
        let client = ConfluenceClient::new(
            "https://wiki.example.com",
            &Credentials::Bearer("t".to_owned()),
        );
        let tmp = tempfile::TempDir::new().unwrap();
        let err = client
            .upload_attachment("1", &tmp.path().join("missing.png"))
            .unwrap_err();
        assert!(matches!(err, ConfluenceError::Io(_)));
    }
}
