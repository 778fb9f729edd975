//! Port definition for remote source fetching.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::ImageResult;

/// Port for downloading remote source images.
#[async_trait]
pub trait SourceFetchPort: Send + Sync {
    /// Fetches the raw bytes at `url`.
    ///
    /// One redirect may be followed on a non-success status carrying a
    /// `Location` header; a second non-success status is a hard failure.
    async fn fetch(&self, url: &str) -> ImageResult<Bytes>;
}
