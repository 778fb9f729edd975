//! Image cache error types.

use thiserror::Error;

/// Result type for image cache operations.
pub type ImageResult<T> = std::result::Result<T, ImageError>;

/// Image cache error variants.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ImageError {
    #[error("could not generate URL for {identifier}: file not found")]
    SourceNotFound { identifier: String },

    #[error("unknown transformation: {name}")]
    UnknownTransformation { name: String },

    #[error("could not fetch {url}: {message}")]
    SourceFetchFailed { url: String, message: String },

    #[error("failed to decode image: {message}")]
    Decode { message: String },

    #[error("failed to encode image: {message}")]
    Encode { message: String },

    #[error("invalid option {key} for {transformation}: {message}")]
    InvalidOption {
        transformation: String,
        key: String,
        message: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Creates a source-not-found error.
    #[must_use]
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::SourceNotFound {
            identifier: identifier.into(),
        }
    }

    /// Creates an unknown-transformation error.
    #[must_use]
    pub fn unknown_transformation(name: impl Into<String>) -> Self {
        Self::UnknownTransformation { name: name.into() }
    }

    /// Creates a fetch-failed error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates an invalid-option error.
    #[must_use]
    pub fn invalid_option(
        transformation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            transformation: transformation.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns whether the error came from resolving the source rather
    /// than processing it.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. } | Self::SourceFetchFailed { .. }
        )
    }
}
