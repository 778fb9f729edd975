//! Remote source fetching over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::LOCATION;
use tracing::{debug, warn};

use crate::domain::errors::{ImageError, ImageResult};
use crate::domain::ports::SourceFetchPort;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP fetcher with an explicit one-redirect policy: automatic redirect
/// following is disabled so exactly one `Location` hop is honored and a
/// second non-success status is a hard failure.
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    /// Creates a fetcher with the given request timeout.
    ///
    /// # Errors
    /// Returns a fetch error when the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> ImageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ImageError::fetch_failed("-", format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    /// Returns a fetch error when the HTTP client cannot be constructed.
    pub fn with_default_timeout() -> ImageResult<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    async fn get(&self, url: &str) -> ImageResult<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::fetch_failed(url, e.to_string()))
    }
}

#[async_trait]
impl SourceFetchPort for HttpSourceFetcher {
    async fn fetch(&self, url: &str) -> ImageResult<Bytes> {
        let mut response = self.get(url).await?;

        if !response.status().is_success() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            match location {
                Some(location) => {
                    debug!(url, location, "Following redirect");
                    response = self.get(&location).await?;
                }
                None => {
                    warn!(url, status = %response.status(), "Fetch failed without redirect");
                    return Err(ImageError::fetch_failed(
                        url,
                        format!("HTTP {}", response.status()),
                    ));
                }
            }
        }

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "Fetch failed after redirect");
            return Err(ImageError::fetch_failed(
                url,
                format!("HTTP {} after redirect", response.status()),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| ImageError::fetch_failed(url, e.to_string()))
    }
}
