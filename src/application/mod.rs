//! Application layer with the URL generation and cache control facades.

/// Administrative cache control.
pub mod cache_control;
/// Image URL generation.
pub mod url_generator;

pub use cache_control::ImageCacheControl;
pub use url_generator::ImageUrlGenerator;
