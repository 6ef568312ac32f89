//! Kroki rasterizer: renders diagram source to PNG over HTTP.

use std::time::Duration;

use ureq::Agent;

use crate::consts::DEFAULT_TIMEOUT;
use crate::language::DiagramLanguage;

/// External renderer turning diagram source into image bytes.
///
/// Implementations are pure from the pipeline's point of view: the same
/// source yields an equivalent image. Caching is handled by
/// [`DiagramRasterizer`](crate::DiagramRasterizer), not by implementations.
pub trait Rasterizer: Send + Sync {
    /// Render diagram source to PNG bytes.
    fn rasterize(&self, language: DiagramLanguage, source: &str)
    -> Result<Vec<u8>, RasterizeError>;
}

/// Diagram rasterization error.
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    /// Request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with an error status.
    #[error("HTTP {status}: {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (usually the diagram syntax error).
        body: String,
    },

    /// Response was not a PNG image.
    #[error("invalid PNG data")]
    InvalidPng,

    /// Image could not be written to the cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// [`Rasterizer`] backed by a Kroki server.
///
/// Sends `POST {url}/{endpoint}/png` with the diagram source as `text/plain`.
pub struct KrokiRasterizer {
    url: String,
    agent: Agent,
}

impl KrokiRasterizer {
    /// Create a rasterizer for the given Kroki server URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_owned(),
            agent: create_agent(DEFAULT_TIMEOUT),
        }
    }

    /// Set HTTP timeout for Kroki requests (default 30 seconds).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    /// Kroki server URL without trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Rasterizer for KrokiRasterizer {
    fn rasterize(
        &self,
        language: DiagramLanguage,
        source: &str,
    ) -> Result<Vec<u8>, RasterizeError> {
        let url = format!("{}/{}/png", self.url, language.endpoint());
        tracing::debug!("Rendering {} diagram via {url}", language.endpoint());

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(source.as_bytes())
            .map_err(|e| RasterizeError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(RasterizeError::HttpResponse {
                status,
                body: error_body,
            });
        }

        body.read_to_vec()
            .map_err(|e| RasterizeError::Http(e.to_string()))
    }
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
