//! Built-in transformations.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::domain::errors::{ImageError, ImageResult};
use crate::domain::ports::TransformationPort;

/// Returns the built-in transformation set: `resize`, `thumbnail` and
/// `grayscale`.
#[must_use]
pub fn default_transformations() -> Vec<Arc<dyn TransformationPort>> {
    vec![
        Arc::new(ResizeTransform),
        Arc::new(ThumbnailTransform),
        Arc::new(GrayscaleTransform),
    ]
}

fn dimension(
    transformation: &str,
    options: &BTreeMap<String, String>,
    key: &str,
) -> ImageResult<u32> {
    let raw = options
        .get(key)
        .ok_or_else(|| ImageError::invalid_option(transformation, key, "missing"))?;
    raw.parse::<u32>()
        .map_err(|e| ImageError::invalid_option(transformation, key, e.to_string()))
        .and_then(|value| {
            if value == 0 {
                Err(ImageError::invalid_option(transformation, key, "must be positive"))
            } else {
                Ok(value)
            }
        })
}

/// Aspect-preserving downscale to fit within `width` x `height`.
/// A no-op when the image already fits.
pub struct ResizeTransform;

impl TransformationPort for ResizeTransform {
    fn name(&self) -> &str {
        "resize"
    }

    fn apply(
        &self,
        image: &DynamicImage,
        options: &BTreeMap<String, String>,
    ) -> ImageResult<Option<DynamicImage>> {
        let width = dimension(self.name(), options, "width")?;
        let height = dimension(self.name(), options, "height")?;

        if image.width() <= width && image.height() <= height {
            return Ok(None);
        }

        Ok(Some(image.resize(width, height, FilterType::Lanczos3)))
    }
}

/// Fast thumbnail downscale (nearest-neighbor sampling) to fit within
/// `width` x `height`. A no-op when the image already fits.
pub struct ThumbnailTransform;

impl TransformationPort for ThumbnailTransform {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn apply(
        &self,
        image: &DynamicImage,
        options: &BTreeMap<String, String>,
    ) -> ImageResult<Option<DynamicImage>> {
        let width = dimension(self.name(), options, "width")?;
        let height = dimension(self.name(), options, "height")?;

        if image.width() <= width && image.height() <= height {
            return Ok(None);
        }

        Ok(Some(image.thumbnail(width, height)))
    }
}

/// Luma conversion. A no-op when the image is already grayscale.
pub struct GrayscaleTransform;

impl TransformationPort for GrayscaleTransform {
    fn name(&self) -> &str {
        "grayscale"
    }

    fn apply(
        &self,
        image: &DynamicImage,
        _options: &BTreeMap<String, String>,
    ) -> ImageResult<Option<DynamicImage>> {
        if matches!(
            image.color(),
            image::ColorType::L8 | image::ColorType::La8 | image::ColorType::L16 | image::ColorType::La16
        ) {
            return Ok(None);
        }

        Ok(Some(image.grayscale()))
    }
}
