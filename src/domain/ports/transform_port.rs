//! Port definitions for image transformation and optimization.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::errors::ImageResult;

/// A named image transformation.
///
/// Implementations are CPU-bound and synchronous; callers run them on a
/// blocking thread. Returning `None` signals a semantic no-op (for example
/// a resize request the image already satisfies), which lets the pipeline
/// skip re-encoding entirely.
pub trait TransformationPort: Send + Sync {
    /// Registry name used to select this transformation.
    fn name(&self) -> &str;

    /// Applies the transformation, or returns `None` when it would not
    /// change the image.
    fn apply(
        &self,
        image: &image::DynamicImage,
        options: &BTreeMap<String, String>,
    ) -> ImageResult<Option<image::DynamicImage>>;
}

/// Lossless size reduction applied to a finished artifact.
///
/// Optimization is best-effort: callers log failures and keep the
/// un-optimized artifact.
pub trait OptimizerPort: Send + Sync {
    /// Rewrites the file at `path` with a smaller, visually identical
    /// encoding.
    fn optimize(&self, path: &Path) -> ImageResult<()>;
}
