//! Image URL generation facade.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::domain::entities::TransformationSpec;
use crate::domain::errors::{ImageError, ImageResult};
use crate::domain::ports::{SourceFetchPort, UrlStrategy};
use crate::infrastructure::cdn::{DirectUrlStrategy, RotatingCdnStrategy};
use crate::infrastructure::config::ImageCacheConfig;
use crate::infrastructure::fetch::HttpSourceFetcher;
use crate::infrastructure::keys::CacheKeyBuilder;
use crate::infrastructure::optimizer::PngOptimizer;
use crate::infrastructure::pipeline::TransformationPipeline;
use crate::infrastructure::resolver::SourceResolver;
use crate::infrastructure::store::DerivativeStore;
use crate::infrastructure::transforms::default_transformations;

/// Generates stable public URLs for image derivatives.
///
/// Request flow: resolve the identifier, derive the cache key, let the
/// store return or materialize the artifact, and hand the artifact's
/// public-root-relative path to the URL strategy.
pub struct ImageUrlGenerator {
    resolver: SourceResolver,
    store: Arc<DerivativeStore>,
    pipeline: Arc<TransformationPipeline>,
    fetcher: Arc<dyn SourceFetchPort>,
    url_strategy: Arc<dyn UrlStrategy>,
}

impl ImageUrlGenerator {
    /// Creates a generator from explicit parts.
    #[must_use]
    pub fn new(
        resolver: SourceResolver,
        store: Arc<DerivativeStore>,
        pipeline: Arc<TransformationPipeline>,
        fetcher: Arc<dyn SourceFetchPort>,
        url_strategy: Arc<dyn UrlStrategy>,
    ) -> Self {
        Self {
            resolver,
            store,
            pipeline,
            fetcher,
            url_strategy,
        }
    }

    /// Assembles a generator from configuration: built-in transformations,
    /// PNG optimizer, HTTP fetcher, and a direct or rotating URL strategy
    /// depending on whether CDN endpoints are configured.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn from_config(config: &ImageCacheConfig) -> ImageResult<Self> {
        let resolver = SourceResolver::new(config.all_search_roots());
        let store = Arc::new(DerivativeStore::new(
            config.public_root.clone(),
            &config.cache_path,
        ));
        let pipeline = Arc::new(TransformationPipeline::new(
            default_transformations(),
            Arc::new(PngOptimizer),
        ));
        let fetcher = Arc::new(HttpSourceFetcher::new(Duration::from_secs(
            config.fetch_timeout_secs,
        ))?);

        let url_strategy: Arc<dyn UrlStrategy> = if config.cdn_base_urls.is_empty() {
            Arc::new(DirectUrlStrategy::new(config.base_url.clone()))
        } else {
            Arc::new(RotatingCdnStrategy::new(
                config.cdn_base_urls.clone(),
                config.cdn_path_prefix.clone(),
            ))
        };

        Ok(Self::new(resolver, store, pipeline, fetcher, url_strategy))
    }

    /// Returns the derivative store, shared with administrative facades.
    #[must_use]
    pub fn store(&self) -> Arc<DerivativeStore> {
        Arc::clone(&self.store)
    }

    /// Generates a public URL for the identified image with the given
    /// transformations, materializing the derivative when missing or
    /// stale.
    ///
    /// # Errors
    /// `SourceNotFound` when the identifier resolves to nothing,
    /// `UnknownTransformation` for unregistered names,
    /// `SourceFetchFailed` when a remote source cannot be downloaded,
    /// and I/O errors from the store.
    pub async fn generate_url(
        &self,
        identifier: &str,
        transformations: &TransformationSpec,
    ) -> ImageResult<String> {
        self.pipeline.validate(transformations)?;

        let source = self.resolver.resolve(identifier).await?;

        // A remote image with nothing to apply is already a servable URL.
        if source.is_remote() && transformations.is_empty() {
            debug!(identifier, "Remote source without transformations, returning as-is");
            return Ok(identifier.to_string());
        }

        if let Some(path) = self.store.passthrough(&source, transformations) {
            debug!(identifier, "Serving source directly from the public root");
            let relative = self.store.relative_path(&path)?;
            return Ok(self.url_strategy.get_url(&relative));
        }

        let key = CacheKeyBuilder::build(&source, transformations);

        let pipeline = Arc::clone(&self.pipeline);
        let fetcher = Arc::clone(&self.fetcher);
        let spec = transformations.clone();
        let path = self
            .store
            .materialize(&key, &source, move |source, temp| async move {
                let bytes: Bytes = if source.is_remote() {
                    fetcher.fetch(source.identifier()).await?
                } else {
                    let absolute = source.absolute_path().ok_or_else(|| {
                        ImageError::not_found(source.identifier().to_string())
                    })?;
                    tokio::fs::read(absolute).await?.into()
                };

                if spec.is_empty() {
                    // Local file outside the public root: copy verbatim.
                    if source.is_remote() {
                        tokio::fs::write(&temp, &bytes).await?;
                        return Ok(true);
                    }
                    return Ok(false);
                }

                if pipeline.process_bytes(bytes.clone(), &spec, &temp).await? {
                    return Ok(true);
                }

                // Every transformation was a no-op; keep the source bytes.
                if source.is_remote() {
                    tokio::fs::write(&temp, &bytes).await?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .await?;

        info!(identifier, key = %key, "Derivative ready");
        let relative = self.store.relative_path(&path)?;
        Ok(self.url_strategy.get_url(&relative))
    }
}
