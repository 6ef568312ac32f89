//! CLI command implementations.

pub(crate) mod publish;
pub(crate) mod render;
pub(crate) mod sync;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use docsync_config::{CliSettings, Config, ConfluenceConfig, DiagramsConfig};
use docsync_confluence::{ConfluenceClient, Credentials};
use docsync_diagrams::{DiagramRasterizer, DirImageCache, KrokiRasterizer};
use docsync_publish::{
    NavNode, NodeStatus, PageIdentityMap, PageNaming, SyncReport, leaves, load_mkdocs_nav,
    scan_docs_dir,
};

use crate::error::CliError;
use crate::output::Output;

pub(crate) use publish::PublishArgs;
pub(crate) use render::RenderArgs;
pub(crate) use sync::SyncArgs;

/// Diagram cache format version; bump to invalidate cached images.
const DIAGRAM_CACHE_VERSION: &str = "1";

/// Arguments shared by commands that talk to Confluence.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover docsync.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Documentation source directory (overrides config).
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long)]
    pub kroki_url: Option<String>,

    /// Target space key (overrides config).
    #[arg(long, env = "DOCSYNC_SPACE")]
    pub space: Option<String>,

    /// Page under which the tree is mirrored (overrides config).
    #[arg(long, env = "DOCSYNC_PARENT_ID")]
    pub parent_id: Option<String>,

    /// Write the source path to page identity map as JSON.
    #[arg(long)]
    pub map_out: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with command-line overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            source_dir: self.source_dir.clone(),
            kroki_url: self.kroki_url.clone(),
            space: self.space.clone(),
            parent_id: self.parent_id.clone(),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Load the navigation tree from the configured nav file, or by walking the docs directory.
pub(crate) fn load_nav(config: &Config) -> Result<Vec<NavNode>, CliError> {
    let docs_dir = &config.docs_resolved.source_dir;
    let nav = match &config.docs_resolved.nav_file {
        Some(nav_file) => load_mkdocs_nav(nav_file, docs_dir)?,
        None => scan_docs_dir(docs_dir)?,
    };
    tracing::debug!(
        "Loaded navigation with {} pages from {}",
        leaves(&nav).len(),
        docs_dir.display()
    );
    Ok(nav)
}

/// Build an authenticated client: Basic when a username is configured, Bearer otherwise.
pub(crate) fn create_confluence_client(conf: &ConfluenceConfig) -> ConfluenceClient {
    let credentials = match &conf.username {
        Some(username) => Credentials::Basic {
            username: username.clone(),
            token: conf.token.clone(),
        },
        None => Credentials::Bearer(conf.token.clone()),
    };
    ConfluenceClient::new(&conf.base_url, &credentials)
}

/// Build the diagram renderer when a Kroki URL is configured.
pub(crate) fn create_diagram_rasterizer(diagrams: &DiagramsConfig) -> Option<DiagramRasterizer> {
    let kroki_url = diagrams.kroki_url.as_deref()?;
    let kroki = KrokiRasterizer::new(kroki_url).timeout(Duration::from_secs(diagrams.timeout_secs));
    let cache = DirImageCache::new(diagrams.cache_dir.clone(), DIAGRAM_CACHE_VERSION);
    Some(DiagramRasterizer::new(Box::new(kroki), Box::new(cache)))
}

/// Title decoration from the Confluence section.
pub(crate) fn page_naming(conf: &ConfluenceConfig) -> PageNaming {
    PageNaming {
        prefix: conf.page_prefix.clone(),
        suffix: conf.page_suffix.clone(),
    }
}

/// Persist the page identity map as pretty-printed JSON.
pub(crate) fn write_map(path: &Path, map: &PageIdentityMap) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(map)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a page identity map written by [`write_map`].
pub(crate) fn read_map(path: &Path) -> Result<PageIdentityMap, CliError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Print created, reused and skipped nodes.
pub(crate) fn print_sync_report(output: &Output, report: &SyncReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            NodeStatus::Created(page) => {
                output.success(&format!("  + {} (id={})", outcome.title, page.id));
            }
            NodeStatus::Reused(page) => {
                output.detail(&format!("  = {} (id={})", outcome.title, page.id));
            }
            NodeStatus::Skipped { reason } => {
                output.error(&format!("  ! {}: {reason}", outcome.title));
            }
        }
    }
    output.info(&format!(
        "\nPages: {} created, {} reused, {} skipped",
        report.created(),
        report.reused(),
        report.skipped()
    ));
}
