//! Entity definitions.

mod cache_key;
mod source;
mod transformation;

pub use cache_key::CacheKey;
pub use source::{SourceDescriptor, SourceKind};
pub use transformation::{Transformation, TransformationSpec};
