//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, SourceDescriptor, SourceKind, Transformation, TransformationSpec};
pub use errors::{ImageError, ImageResult};
