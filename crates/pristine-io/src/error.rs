//! Error types for fetching, the remote tier, and orchestration.
//!
//! None of these reach the caller of [`Normalizer::render`](crate::Normalizer::render):
//! every failure degrades to the next tier and finally to the original
//! source. They surface in logs and through
//! [`Normalizer::try_render`](crate::Normalizer::try_render).

use std::path::PathBuf;

use pristine_pipeline::{PipelineError, Treatment};

/// Loading the source bytes failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The payload exceeds the configured size limit.
    #[error("source is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Size seen so far (or announced).
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// Reading a local file failed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The request did not finish in time.
    #[error("timed out fetching {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },
}

/// The remote transformation tier failed or declined.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No remote service is configured.
    #[error("remote transformation service not configured")]
    NotConfigured,

    /// The service cannot produce this treatment.
    #[error("remote service does not support the {0} treatment")]
    Unsupported(Treatment),

    /// The request body could not be built.
    #[error("cannot encode remote request: {0}")]
    Request(#[from] serde_json::Error),

    /// Transport-level HTTP failure.
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("remote service returned HTTP {status}: {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// The service answered with something that is not an image.
    #[error("remote service returned an invalid image: {0}")]
    InvalidPayload(#[source] image::ImageError),

    /// The returned image could not be re-encoded.
    #[error("cannot re-encode remote image: {0}")]
    Reencode(#[source] PipelineError),
}

/// A single tier of [`Normalizer`](crate::Normalizer) failed.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The source is configured to pass through untouched.
    #[error("source passes through unprocessed")]
    Passthrough,

    /// Loading the source failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Setting up the remote tier failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The blocking pipeline task panicked or was cancelled.
    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = FetchError::Status {
            status: 404,
            url: "https://cdn.example/a.jpg".to_owned(),
        };
        assert_eq!(err.to_string(), "HTTP 404 for https://cdn.example/a.jpg");

        let err = RemoteError::Unsupported(Treatment::Studio);
        assert_eq!(
            err.to_string(),
            "remote service does not support the studio treatment"
        );

        let err: NormalizeError = PipelineError::EmptyInput.into();
        assert_eq!(err.to_string(), "input image data is empty");
    }
}
