//! Source resolution against the local filesystem and URL detection.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::domain::entities::SourceDescriptor;
use crate::domain::errors::{ImageError, ImageResult};

/// Returns true when the identifier is an absolute HTTP(S) URL.
///
/// Deliberately a plain case-sensitive prefix check, no scheme
/// normalization.
#[must_use]
pub fn is_url(identifier: &str) -> bool {
    identifier.starts_with("http://") || identifier.starts_with("https://")
}

/// Resolves user-supplied identifiers to concrete sources.
///
/// Remote URLs are classified without touching the network; fetching is
/// part of materialization so a cache hit never performs a network call.
/// Paths are tried absolute first, then searched through the configured
/// roots in priority order (public root first), first match wins.
pub struct SourceResolver {
    search_roots: Vec<PathBuf>,
}

impl SourceResolver {
    /// Creates a resolver over the given roots, highest priority first.
    #[must_use]
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self { search_roots }
    }

    /// Resolves an identifier to a source descriptor.
    ///
    /// # Errors
    /// Returns `SourceNotFound` when no candidate path exists after
    /// exhausting all roots.
    pub async fn resolve(&self, identifier: &str) -> ImageResult<SourceDescriptor> {
        if is_url(identifier) {
            trace!(identifier, "Classified as remote URL");
            return Ok(SourceDescriptor::remote(identifier));
        }

        let path = Path::new(identifier);
        if path.is_absolute() {
            if let Some(descriptor) = Self::describe(identifier, path.to_path_buf()).await {
                return Ok(descriptor);
            }
            debug!(identifier, "Absolute path does not exist");
            return Err(ImageError::not_found(identifier));
        }

        for root in &self.search_roots {
            let candidate = root.join(path);
            if let Some(descriptor) = Self::describe(identifier, candidate).await {
                debug!(identifier, root = %root.display(), "Resolved under search root");
                return Ok(descriptor);
            }
        }

        debug!(identifier, "Exhausted all search roots");
        Err(ImageError::not_found(identifier))
    }

    async fn describe(identifier: &str, candidate: PathBuf) -> Option<SourceDescriptor> {
        let meta = tokio::fs::metadata(&candidate).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        Some(SourceDescriptor::local(
            identifier,
            candidate,
            meta.modified().ok(),
        ))
    }
}
