//! Ordered transformation pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::domain::entities::TransformationSpec;
use crate::domain::errors::{ImageError, ImageResult};
use crate::domain::ports::{OptimizerPort, TransformationPort};

/// Applies named transformations in request order, tracking whether the
/// result differs from the input.
///
/// Transformations are resolved from an explicit registry injected at
/// construction, so an unknown name fails at lookup with
/// `UnknownTransformation` instead of deep inside a producer.
pub struct TransformationPipeline {
    registry: HashMap<String, Arc<dyn TransformationPort>>,
    optimizer: Arc<dyn OptimizerPort>,
}

impl TransformationPipeline {
    /// Builds a pipeline over the given transformations and optimizer.
    #[must_use]
    pub fn new(
        transformations: Vec<Arc<dyn TransformationPort>>,
        optimizer: Arc<dyn OptimizerPort>,
    ) -> Self {
        let registry = transformations
            .into_iter()
            .map(|t| (t.name().to_string(), t))
            .collect();
        Self {
            registry,
            optimizer,
        }
    }

    /// Applies the sequence to a decoded image.
    ///
    /// Returns `None` when every transformation was a semantic no-op, so
    /// callers can fall back to a byte copy of the source instead of
    /// re-encoding.
    ///
    /// # Errors
    /// Returns `UnknownTransformation` for names missing from the
    /// registry, or the transformation's own failure.
    pub fn apply(
        &self,
        image: &image::DynamicImage,
        transformations: &TransformationSpec,
    ) -> ImageResult<Option<image::DynamicImage>> {
        let mut current: Option<image::DynamicImage> = None;

        for transformation in transformations {
            let transform = self
                .registry
                .get(&transformation.name)
                .ok_or_else(|| ImageError::unknown_transformation(&transformation.name))?;

            let input = current.as_ref().unwrap_or(image);
            match transform.apply(input, &transformation.options)? {
                Some(transformed) => {
                    trace!(name = %transformation.name, "Applied transformation");
                    current = Some(transformed);
                }
                None => trace!(name = %transformation.name, "Transformation was a no-op"),
            }
        }

        Ok(current)
    }

    /// Decodes `bytes`, applies the sequence, and writes the result to
    /// `target` followed by the optimization pass. Decode and encode run
    /// on a blocking thread.
    ///
    /// Returns `false` without touching `target` when the whole sequence
    /// was a no-op. Optimization failures are logged and swallowed; an
    /// un-optimized artifact is still correct.
    ///
    /// # Errors
    /// Returns decode, transformation, or encode failures.
    pub async fn process_bytes(
        self: &Arc<Self>,
        bytes: Bytes,
        transformations: &TransformationSpec,
        target: &Path,
    ) -> ImageResult<bool> {
        let pipeline = Arc::clone(self);
        let transformations = transformations.clone();
        let target: PathBuf = target.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let format = image::guess_format(&bytes).ok();
            let decoded = image::load_from_memory(&bytes)
                .map_err(|e| ImageError::decode(e.to_string()))?;

            let Some(transformed) = pipeline.apply(&decoded, &transformations)? else {
                return Ok(false);
            };

            let format = format
                .filter(Self::is_writable_format)
                .unwrap_or(image::ImageFormat::Png);
            transformed
                .save_with_format(&target, format)
                .map_err(|e| ImageError::encode(e.to_string()))?;
            debug!(target = %target.display(), ?format, "Encoded derivative");

            if let Err(e) = pipeline.optimizer.optimize(&target) {
                warn!(target = %target.display(), error = %e, "Optimization failed, keeping artifact");
            }

            Ok(true)
        })
        .await
        .map_err(|e| ImageError::encode(format!("processing task panicked: {e}")))?
    }

    /// Fails fast when any transformation name is not registered.
    ///
    /// # Errors
    /// Returns `UnknownTransformation` for the first missing name.
    pub fn validate(&self, transformations: &TransformationSpec) -> ImageResult<()> {
        for transformation in transformations {
            if !self.registry.contains_key(&transformation.name) {
                return Err(ImageError::unknown_transformation(&transformation.name));
            }
        }
        Ok(())
    }

    const fn is_writable_format(format: &image::ImageFormat) -> bool {
        matches!(
            format,
            image::ImageFormat::Png | image::ImageFormat::Jpeg | image::ImageFormat::WebP
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Transformation;
    use crate::infrastructure::optimizer::NoopOptimizer;
    use crate::infrastructure::transforms::default_transformations;
    use std::io::Cursor;

    fn pipeline() -> Arc<TransformationPipeline> {
        Arc::new(TransformationPipeline::new(
            default_transformations(),
            Arc::new(NoopOptimizer),
        ))
    }

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner().into()
    }

    fn resize_spec(width: &str, height: &str) -> TransformationSpec {
        TransformationSpec::new(vec![
            Transformation::new("resize")
                .with_option("width", width)
                .with_option("height", height),
        ])
    }

    #[test]
    fn unknown_transformation_fails_at_lookup() {
        let img = image::DynamicImage::new_rgb8(4, 4);
        let spec = TransformationSpec::new(vec![Transformation::new("sharpen")]);

        let err = pipeline().apply(&img, &spec).unwrap_err();
        assert!(matches!(err, ImageError::UnknownTransformation { .. }));
    }

    #[test]
    fn validate_rejects_unknown_names_without_an_image() {
        let spec = TransformationSpec::new(vec![Transformation::new("sharpen")]);
        assert!(pipeline().validate(&spec).is_err());
        assert!(pipeline().validate(&resize_spec("10", "10")).is_ok());
    }

    #[test]
    fn noop_sequence_returns_none() {
        let img = image::DynamicImage::new_rgb8(10, 10);
        // Image already fits within the requested bounds.
        let result = pipeline().apply(&img, &resize_spec("100", "100")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn downscale_changes_the_image() {
        let img = image::DynamicImage::new_rgb8(100, 100);
        let result = pipeline()
            .apply(&img, &resize_spec("10", "10"))
            .unwrap()
            .unwrap();
        assert!(result.width() <= 10 && result.height() <= 10);
    }

    #[test]
    fn transformations_apply_in_order() {
        let img = image::DynamicImage::new_rgb8(100, 50);
        let spec = TransformationSpec::new(vec![
            Transformation::new("resize")
                .with_option("width", "20")
                .with_option("height", "20"),
            Transformation::new("grayscale"),
        ]);

        let result = pipeline().apply(&img, &spec).unwrap().unwrap();
        assert!(result.width() <= 20);
        assert_eq!(result.color(), image::ColorType::L8);
    }

    #[tokio::test]
    async fn process_bytes_writes_encoded_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out");

        let wrote = pipeline()
            .process_bytes(png_bytes(100, 100), &resize_spec("10", "10"), &target)
            .await
            .unwrap();

        assert!(wrote);
        let reloaded = image::ImageReader::open(&target)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert!(reloaded.width() <= 10);
    }

    #[tokio::test]
    async fn process_bytes_reports_noop_without_writing() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out");

        let wrote = pipeline()
            .process_bytes(png_bytes(5, 5), &resize_spec("100", "100"), &target)
            .await
            .unwrap();

        assert!(!wrote);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn process_bytes_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("out");

        let err = pipeline()
            .process_bytes(Bytes::from_static(b"not an image"), &resize_spec("1", "1"), &target)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }
}
