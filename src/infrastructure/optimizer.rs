//! Lossless artifact optimization.

use std::io::Cursor;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use tracing::{debug, trace};

use crate::domain::errors::{ImageError, ImageResult};
use crate::domain::ports::OptimizerPort;

/// Optimizer that never touches the artifact.
pub struct NoopOptimizer;

impl OptimizerPort for NoopOptimizer {
    fn optimize(&self, _path: &Path) -> ImageResult<()> {
        Ok(())
    }
}

/// Re-encodes PNG artifacts with maximum compression and keeps the
/// smaller of the two encodings. Non-PNG artifacts are left alone.
pub struct PngOptimizer;

impl OptimizerPort for PngOptimizer {
    fn optimize(&self, path: &Path) -> ImageResult<()> {
        let original = std::fs::read(path)?;
        if !matches!(
            image::guess_format(&original),
            Ok(image::ImageFormat::Png)
        ) {
            trace!(path = %path.display(), "Not a PNG, skipping optimization");
            return Ok(());
        }

        let decoded =
            image::load_from_memory(&original).map_err(|e| ImageError::decode(e.to_string()))?;

        let mut recoded = Cursor::new(Vec::with_capacity(original.len()));
        let encoder = PngEncoder::new_with_quality(
            &mut recoded,
            CompressionType::Best,
            FilterType::Adaptive,
        );
        decoded
            .write_with_encoder(encoder)
            .map_err(|e| ImageError::encode(e.to_string()))?;

        let recoded = recoded.into_inner();
        if recoded.len() < original.len() {
            std::fs::write(path, &recoded)?;
            debug!(
                path = %path.display(),
                before = original.len(),
                after = recoded.len(),
                "Optimized PNG artifact"
            );
        } else {
            trace!(path = %path.display(), "Re-encoding did not shrink, keeping original");
        }

        Ok(())
    }
}
