//! Runtime configuration for fetching, the remote tier, and the
//! orchestrator.
//!
//! Everything tunable lives in [`NormalizerConfig`] so a deployment can
//! adjust limits without touching code. It deserializes from JSON with
//! every field optional.

use std::time::Duration;

use pristine_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Source fetch limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Largest accepted source, in bytes.
    pub max_bytes: u64,
    /// Whole-request timeout for URL sources, in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent with URL requests.
    pub user_agent: String,
}

impl FetchConfig {
    /// Default size limit (50 MiB).
    pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// The request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_bytes: Self::DEFAULT_MAX_BYTES,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("pristine/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// remove.bg settings. The remote tier is off unless an API key is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API key, sent as `X-Api-Key`.
    pub api_key: Option<String>,
    /// Endpoint URL.
    pub endpoint: String,
    /// Request timeout, in seconds.
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Default remove.bg endpoint.
    pub const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Configuration of a [`Normalizer`](crate::Normalizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Pixel pipeline settings.
    pub pipeline: PipelineConfig,
    /// Source fetch limits.
    pub fetch: FetchConfig,
    /// Remote tier settings.
    pub remote: RemoteConfig,
    /// URLs containing any of these markers are already processed and
    /// pass through.
    pub processed_markers: Vec<String>,
    /// Placeholder images that pass through.
    pub placeholder_urls: Vec<String>,
    /// Maximum number of cached results. `0` means unbounded.
    pub cache_capacity: usize,
}

impl NormalizerConfig {
    /// Default "already processed" URL marker.
    pub const DEFAULT_PROCESSED_MARKER: &str = "processed-";
    /// Default placeholder image URL.
    pub const DEFAULT_PLACEHOLDER_URL: &str = "https://via.placeholder.com/400x400?text=No+Image";
    /// Default result cache capacity.
    pub const DEFAULT_CACHE_CAPACITY: usize = 256;

    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether `url` should be shown as is.
    #[must_use]
    pub fn is_passthrough_url(&self, url: &str) -> bool {
        url.trim().is_empty()
            || self
                .processed_markers
                .iter()
                .any(|marker| !marker.is_empty() && url.contains(marker.as_str()))
            || self.placeholder_urls.iter().any(|p| p == url)
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            fetch: FetchConfig::default(),
            remote: RemoteConfig::default(),
            processed_markers: vec![Self::DEFAULT_PROCESSED_MARKER.to_owned()],
            placeholder_urls: vec![Self::DEFAULT_PLACEHOLDER_URL.to_owned()],
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}
