//! The managed remote transformation tier.
//!
//! Tried before the local pipeline. Any error here only means "fall
//! through to the next tier".

use std::future::Future;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use pristine_pipeline::encode::encode_png;
use pristine_pipeline::{Dimensions, EncodedImage, OutputFormat, Treatment};
use serde::Serialize;

use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// What the remote service is given.
#[derive(Debug, Clone, Copy)]
pub enum RemoteInput<'a> {
    /// A publicly reachable URL the service fetches itself.
    Url(&'a str),
    /// The encoded source bytes.
    Bytes(&'a [u8]),
}

/// A remote image transformation service.
pub trait RemoteTransform: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Produce `treatment` of `input`.
    fn transform(
        &self,
        input: RemoteInput<'_>,
        treatment: Treatment,
    ) -> impl Future<Output = Result<EncodedImage, RemoteError>> + Send;
}

/// No remote service: every request is declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteTransform for NoRemote {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn transform(
        &self,
        _input: RemoteInput<'_>,
        _treatment: Treatment,
    ) -> Result<EncodedImage, RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}

/// Longest error body kept in [`RemoteError::Status`].
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct RemoveBgRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_file_b64: Option<String>,
    size: &'static str,
    format: &'static str,
}

impl<'a> RemoveBgRequest<'a> {
    fn new(input: RemoteInput<'a>) -> Self {
        let (image_url, image_file_b64) = match input {
            RemoteInput::Url(url) => (Some(url), None),
            RemoteInput::Bytes(bytes) => (None, Some(STANDARD.encode(bytes))),
        };
        Self {
            image_url,
            image_file_b64,
            size: "auto",
            format: "png",
        }
    }
}

/// remove.bg client. Supports the [`Treatment::Cutout`] treatment only.
#[derive(Debug, Clone)]
pub struct RemoveBgClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RemoveBgClient {
    /// Build a client for `endpoint` authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from `config`, or `None` when no API key is set.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, RemoteError> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Self::new(
                config.endpoint.clone(),
                key,
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            _ => Ok(None),
        }
    }
}

impl RemoteTransform for RemoveBgClient {
    fn name(&self) -> &'static str {
        "remove.bg"
    }

    async fn transform(
        &self,
        input: RemoteInput<'_>,
        treatment: Treatment,
    ) -> Result<EncodedImage, RemoteError> {
        if treatment != Treatment::Cutout {
            return Err(RemoteError::Unsupported(treatment));
        }
        let body = serde_json::to_vec(&RemoveBgRequest::new(input))?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "image/*")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_MESSAGE_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        into_encoded(bytes)
    }
}

/// Either no remote tier or remove.bg, whichever the config asks for.
#[derive(Debug, Clone)]
pub enum AnyRemote {
    /// Remote tier disabled.
    Disabled(NoRemote),
    /// remove.bg.
    RemoveBg(RemoveBgClient),
}

impl AnyRemote {
    /// remove.bg when an API key is configured, otherwise disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Ok(RemoveBgClient::from_config(config)?
            .map_or(Self::Disabled(NoRemote), Self::RemoveBg))
    }
}

impl RemoteTransform for AnyRemote {
    fn name(&self) -> &'static str {
        match self {
            Self::Disabled(remote) => remote.name(),
            Self::RemoveBg(remote) => remote.name(),
        }
    }

    async fn transform(
        &self,
        input: RemoteInput<'_>,
        treatment: Treatment,
    ) -> Result<EncodedImage, RemoteError> {
        match self {
            Self::Disabled(remote) => remote.transform(input, treatment).await,
            Self::RemoveBg(remote) => remote.transform(input, treatment).await,
        }
    }
}

/// Validate a returned payload and wrap it, re-encoding formats other
/// than PNG and JPEG to PNG.
fn into_encoded(bytes: Vec<u8>) -> Result<EncodedImage, RemoteError> {
    let format = image::guess_format(&bytes).map_err(RemoteError::InvalidPayload)?;
    let decoded = image::load_from_memory(&bytes).map_err(RemoteError::InvalidPayload)?;
    let dimensions = Dimensions {
        width: decoded.width(),
        height: decoded.height(),
    };
    match format {
        ImageFormat::Png => Ok(EncodedImage {
            format: OutputFormat::Png,
            dimensions,
            bytes,
        }),
        ImageFormat::Jpeg => Ok(EncodedImage {
            format: OutputFormat::Jpeg,
            dimensions,
            bytes,
        }),
        _ => encode_png(&decoded.to_rgba8()).map_err(RemoteError::Reencode),
    }
}
