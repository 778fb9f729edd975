//! Administrative cache control facade.

use std::sync::Arc;

use tracing::info;

use crate::domain::errors::ImageResult;
use crate::infrastructure::store::{DerivativeStore, StoreStats};

/// Name of this cache control.
pub const NAME: &str = "image";

/// Administrative interface over the derivative cache. Supports bulk
/// clearing only; individual keys are never manipulated directly.
pub struct ImageCacheControl {
    store: Arc<DerivativeStore>,
}

impl ImageCacheControl {
    /// Creates a control over the given store.
    #[must_use]
    pub fn new(store: Arc<DerivativeStore>) -> Self {
        Self { store }
    }

    /// Returns whether this cache is enabled. Always true: the image
    /// cache cannot be turned off.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        true
    }

    /// Clears the entire derivative cache.
    ///
    /// # Errors
    /// Returns filesystem errors from the underlying delete.
    pub async fn clear(&self) -> ImageResult<()> {
        info!(cache = NAME, "Clearing derivative cache");
        self.store.clear().await
    }

    /// Reports artifact count and total size.
    ///
    /// # Errors
    /// Returns filesystem errors from scanning the cache directory.
    pub async fn stats(&self) -> ImageResult<StoreStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::DEFAULT_CACHE_PATH;
    use tempfile::TempDir;

    #[tokio::test]
    async fn is_always_enabled() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DerivativeStore::new(
            dir.path().to_path_buf(),
            DEFAULT_CACHE_PATH,
        ));
        assert!(ImageCacheControl::new(store).is_enabled());
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DerivativeStore::new(
            dir.path().to_path_buf(),
            DEFAULT_CACHE_PATH,
        ));
        let cache_dir = store.cache_dir().to_path_buf();
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("abc-logo.png"), b"artifact").unwrap();

        let control = ImageCacheControl::new(store);
        assert_eq!(control.stats().await.unwrap().artifacts, 1);

        control.clear().await.unwrap();
        assert_eq!(control.stats().await.unwrap().artifacts, 0);
        assert!(!cache_dir.exists());
    }
}
