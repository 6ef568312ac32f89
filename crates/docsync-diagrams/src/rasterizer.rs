//! Cached diagram rendering.
//!
//! [`DiagramRasterizer`] sits between the content pipeline and an external
//! [`Rasterizer`]: it derives the content hash, answers from the
//! [`ImageCache`] when possible, and otherwise renders once and stores the
//! image. Renders of the same key are serialized so concurrent pages never
//! race on one cache entry; a key's lock lives only while renders of it are
//! in flight.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{DiagramKey, ImageCache};
use crate::consts::PNG_SIGNATURE;
use crate::kroki::{RasterizeError, Rasterizer};
use crate::language::DiagramLanguage;

/// Output format requested from the rasterizer.
const FORMAT: &str = "png";

/// Content-addressed, cache-backed diagram renderer.
pub struct DiagramRasterizer {
    rasterizer: Box<dyn Rasterizer>,
    cache: Box<dyn ImageCache>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DiagramRasterizer {
    /// Create a renderer over an external rasterizer and an injected cache.
    #[must_use]
    pub fn new(rasterizer: Box<dyn Rasterizer>, cache: Box<dyn ImageCache>) -> Self {
        Self {
            rasterizer,
            cache,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Render a diagram, returning the cached image path.
    ///
    /// Failures are logged and reported as `None`; callers keep the original
    /// code block in that case.
    pub fn render(&self, language: DiagramLanguage, source: &str) -> Option<PathBuf> {
        match self.try_render(language, source) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to render {} diagram: {e}", language.endpoint());
                None
            }
        }
    }

    /// Render a diagram, returning the error on failure.
    pub fn try_render(
        &self,
        language: DiagramLanguage,
        source: &str,
    ) -> Result<PathBuf, RasterizeError> {
        let key = DiagramKey {
            source,
            endpoint: language.endpoint(),
            format: FORMAT,
        };
        let filename = key.filename();

        if let Some(path) = self.cache.get(&filename) {
            tracing::debug!("Using cached diagram image: {}", path.display());
            return Ok(path);
        }

        let lock = self.lock_for(&filename);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.render_locked(language, source, &filename)
        };
        self.release(&filename, &lock);
        result
    }

    fn render_locked(
        &self,
        language: DiagramLanguage,
        source: &str,
        filename: &str,
    ) -> Result<PathBuf, RasterizeError> {
        // Another thread may have stored it while we waited for the lock
        if let Some(path) = self.cache.get(filename) {
            return Ok(path);
        }

        let data = self.rasterizer.rasterize(language, source)?;
        if !data.starts_with(PNG_SIGNATURE) {
            return Err(RasterizeError::InvalidPng);
        }

        let path = self.cache.put(filename, &data)?;
        tracing::info!("Rendered {} diagram to {}", language.endpoint(), path.display());
        Ok(path)
    }

    fn lock_for(&self, filename: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(filename.to_owned()).or_default())
    }

    /// Drop the key's lock entry once no other render holds or waits on it.
    ///
    /// Handles are cloned only under the map lock, so a count of two (map plus
    /// `lock`) means nobody else can reach the entry.
    fn release(&self, filename: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(lock) == 2 {
            locks.remove(filename);
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
