//! Content-addressed storage for rendered diagram images.
//!
//! [`DiagramKey`] computes the content hash; [`ImageCache`] maps the derived
//! file name to an image file on disk. Images must live on the filesystem
//! because they are uploaded as page attachments by path.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

/// Diagram parameters for cache key computation.
#[derive(Debug, Clone, Copy)]
pub struct DiagramKey<'a> {
    /// Diagram source code.
    pub source: &'a str,
    /// Kroki endpoint (e.g., "plantuml", "mermaid").
    pub endpoint: &'a str,
    /// Output format extension ("png").
    pub format: &'a str,
}

impl DiagramKey<'_> {
    /// SHA-256 hex digest of `"{endpoint}:{format}:{source}"`.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!("{}:{}:{}", self.endpoint, self.format, self.source);
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Attachment file name derived from the hash, e.g. `diagram_0a1b2c3d4e5f6a7b.png`.
    #[must_use]
    pub fn filename(&self) -> String {
        let hash = self.compute_hash();
        format!("diagram_{}.{}", &hash[..16], self.format)
    }
}

/// Shared image store keyed by content-derived file name.
///
/// Implementations must be safe to share across threads. Writers for
/// different keys never conflict; callers serialize writers for the same key.
pub trait ImageCache: Send + Sync {
    /// Path of a previously stored image, if present.
    fn get(&self, filename: &str) -> Option<PathBuf>;

    /// Store image bytes and return the path they were written to.
    fn put(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf>;
}

/// [`ImageCache`] backed by a flat directory of image files.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- VERSION                     # cache format version
/// +-- diagram_0a1b2c3d4e5f6a7b.png
/// +-- ...
/// ```
#[derive(Debug)]
pub struct DirImageCache {
    root: PathBuf,
}

impl DirImageCache {
    /// Open a cache rooted at `root`, validating the cache version.
    ///
    /// If the `VERSION` file does not match `version`, the directory is wiped
    /// and recreated. Errors during validation are logged but never fatal.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        validate_version(&root, version);
        Self { root }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageCache for DirImageCache {
    fn get(&self, filename: &str) -> Option<PathBuf> {
        let path = self.root.join(filename);
        path.is_file().then_some(path)
    }

    fn put(&self, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(filename);

        // Write-then-rename so readers never observe a partial image
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(data)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("diagram cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "diagram cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no diagram cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove diagram cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create diagram cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write diagram cache VERSION file: {e}");
    }
}
