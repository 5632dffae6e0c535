//! Where an image comes from, and how it should be shown.

use std::fmt;
use std::hash::Hasher as _;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

/// Display context of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayHint {
    /// A product photo: run the full pipeline.
    #[default]
    Product,
    /// Decorative content: show as is.
    Decorative,
}

/// A source image reference.
///
/// The reference itself is what the caller gets back when processing
/// falls back to the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Remote image.
    Url(String),
    /// Local file.
    Path(PathBuf),
    /// Bytes already in memory, identified by a content hash.
    Inline {
        /// Content key (`inline:<hash>`).
        key: String,
        /// Encoded image bytes.
        bytes: Arc<[u8]>,
    },
}

impl ImageSource {
    /// Interpret `reference` as a URL if it has an `http`/`https` scheme,
    /// otherwise as a file path.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        let lower = reference.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(reference.trim().to_owned())
        } else {
            Self::Path(PathBuf::from(reference))
        }
    }

    /// Wrap in-memory bytes, keyed by their SipHash-1-3.
    #[must_use]
    pub fn inline(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let mut hasher = SipHasher13::new();
        hasher.write(&bytes);
        Self::Inline {
            key: format!("inline:{:016x}", hasher.finish()),
            bytes,
        }
    }

    /// Stable identity of this source, used as the cache key.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::Inline { key, .. } => key.clone(),
        }
    }

    /// The URL, for URL sources.
    #[must_use]
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Path(_) | Self::Inline { .. } => None,
        }
    }

    /// Whether the reference is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Url(url) => url.trim().is_empty(),
            Self::Path(path) => path.as_os_str().is_empty(),
            Self::Inline { bytes, .. } => bytes.is_empty(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Inline { key, bytes } => write!(f, "{key} ({} bytes)", bytes.len()),
        }
    }
}
