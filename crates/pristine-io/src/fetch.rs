//! Loading source bytes: the single suspension point before the
//! synchronous pipeline.

use std::future::Future;
use std::path::Path;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::source::ImageSource;

/// Loads the encoded bytes of an [`ImageSource`].
pub trait Fetch: Send + Sync {
    /// Fetch the bytes of `source`.
    fn fetch(&self, source: &ImageSource) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetches URLs over HTTP(S) and files from the local filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Build a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::debug!("fetching {url}");
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        if let Some(announced) = response.content_length() {
            check_size(announced, self.max_bytes)?;
        }

        // Stream so an unannounced oversized body is cut off early.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_reqwest_error(e, url))?
        {
            bytes.extend_from_slice(&chunk);
            check_size(bytes.len() as u64, self.max_bytes)?;
        }
        log::debug!("fetched {} bytes from {url}", bytes.len());
        Ok(bytes)
    }

    async fn fetch_path(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        let io_error = |source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        check_size(metadata.len(), self.max_bytes)?;
        tokio::fs::read(path).await.map_err(io_error)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, FetchError> {
        match source {
            ImageSource::Url(url) => self.fetch_url(url).await,
            ImageSource::Path(path) => self.fetch_path(path).await,
            ImageSource::Inline { bytes, .. } => {
                check_size(bytes.len() as u64, self.max_bytes)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

fn check_size(size: u64, limit: u64) -> Result<(), FetchError> {
    if size > limit {
        Err(FetchError::TooLarge { size, limit })
    } else {
        Ok(())
    }
}

fn map_reqwest_error(error: reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_owned(),
        }
    } else {
        FetchError::Http(error)
    }
}
