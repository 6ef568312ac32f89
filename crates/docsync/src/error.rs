//! CLI error types.

use docsync_config::ConfigError;
use docsync_publish::NavError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Nav(#[from] NavError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid page map: {0}")]
    Json(#[from] serde_json::Error),
}
