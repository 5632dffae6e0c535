//! The orchestrator: passthrough rules, result cache, per-key in-flight
//! deduplication, and the remote → local → original fallback chain.
//!
//! Per source and treatment the state machine is
//! `Uncached → Processing → {Cached | FallbackOriginal}`:
//!
//! - a cache hit returns immediately;
//! - a miss runs the remote tier, then the local pipeline, and caches the
//!   first success;
//! - if both fail the original reference is returned and nothing is
//!   cached, so a later call retries.
//!
//! Concurrent calls for the same key share one computation: the first
//! caller holds the key's gate, later callers wait on it and then find
//! the result in the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pristine_pipeline::{NoopObserver, StageId, StageObserver, Treatment};

use crate::cache::{CacheKey, ResultCache, cache_for_capacity};
use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, RemoteError};
use crate::fetch::{Fetch, HttpFetcher};
use crate::remote::{AnyRemote, RemoteInput, RemoteTransform};
use crate::rendition::{ProcessedImage, Rendition, Tier};
use crate::source::{DisplayHint, ImageSource};

/// Reports pipeline stage timings through `log` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StageObserver for LogObserver {
    fn stage_completed(&self, stage: StageId, duration: Duration) {
        log::debug!("stage {stage} took {:.3}ms", duration.as_secs_f64() * 1000.0);
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// A key's gate and the number of renders currently holding it.
#[derive(Default)]
struct Slot {
    gate: Gate,
    members: usize,
}

/// Normalizes product images with caching and graceful fallback.
///
/// Generic over the source fetcher and the remote tier so both can be
/// swapped out (in tests, or for other services).
pub struct Normalizer<F = HttpFetcher, R = AnyRemote> {
    fetcher: F,
    remote: R,
    cache: Arc<dyn ResultCache>,
    config: Arc<NormalizerConfig>,
    observer: Arc<dyn StageObserver>,
    in_flight: Mutex<HashMap<CacheKey, Slot>>,
}

impl Normalizer {
    /// Build the production normalizer described by `config`: HTTP/file
    /// fetcher, remove.bg when an API key is set, and a cache sized by
    /// `cache_capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Pipeline`] for an invalid pipeline
    /// config, or an error if an HTTP client cannot be built.
    pub fn from_config(config: NormalizerConfig) -> Result<Self, NormalizeError> {
        config.pipeline.validate()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let remote = AnyRemote::from_config(&config.remote)?;
        let cache = cache_for_capacity(config.cache_capacity);
        Ok(Self::new(fetcher, remote, cache, config))
    }
}

impl<F: Fetch, R: RemoteTransform> Normalizer<F, R> {
    /// Assemble a normalizer from its parts.
    pub fn new(
        fetcher: F,
        remote: R,
        cache: Arc<dyn ResultCache>,
        config: NormalizerConfig,
    ) -> Self {
        Self {
            fetcher,
            remote,
            cache,
            config: Arc::new(config),
            observer: Arc::new(NoopObserver),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Report pipeline stages to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// The result cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    /// Render `source`. Never fails: on any error the original reference
    /// comes back.
    pub async fn render(
        &self,
        source: &ImageSource,
        hint: DisplayHint,
        treatment: Treatment,
    ) -> Rendition {
        match self.try_render(source, hint, treatment).await {
            Ok(image) => Rendition::Processed(image),
            Err(NormalizeError::Passthrough) => {
                log::debug!("{source}: passthrough");
                Rendition::Original(source.clone())
            }
            Err(e) => {
                log::warn!("{source}: processing failed, showing original: {e}");
                Rendition::Original(source.clone())
            }
        }
    }

    /// Render `source`, surfacing the error of the last tier tried.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Passthrough`] for sources that are not
    /// processed, otherwise the error that stopped the local pipeline.
    pub async fn try_render(
        &self,
        source: &ImageSource,
        hint: DisplayHint,
        treatment: Treatment,
    ) -> Result<Arc<ProcessedImage>, NormalizeError> {
        if self.is_passthrough(source, hint) {
            return Err(NormalizeError::Passthrough);
        }

        let key = CacheKey::new(source.identity(), treatment);
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("{key}: cache hit");
            return Ok(hit);
        }

        let in_flight = InFlight::enter(&self.in_flight, &key);
        let _turn = in_flight.gate.lock().await;

        // Whoever held the gate before us may have filled the cache.
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("{key}: cache hit after waiting");
            return Ok(hit);
        }

        let processed = Arc::new(self.process(source, treatment).await?);
        self.cache.put(key, Arc::clone(&processed));
        Ok(processed)
    }

    fn is_passthrough(&self, source: &ImageSource, hint: DisplayHint) -> bool {
        if hint == DisplayHint::Decorative || source.is_blank() {
            return true;
        }
        source
            .as_url()
            .is_some_and(|url| self.config.is_passthrough_url(url))
    }

    /// Run the remote tier, then the local pipeline.
    async fn process(
        &self,
        source: &ImageSource,
        treatment: Treatment,
    ) -> Result<ProcessedImage, NormalizeError> {
        // URL sources go to the remote service as URLs; anything else has
        // to be loaded first either way.
        let prefetched = match source {
            ImageSource::Url(_) => None,
            _ => Some(self.fetcher.fetch(source).await?),
        };
        let input = match (source.as_url(), &prefetched) {
            (Some(url), _) => RemoteInput::Url(url),
            (None, Some(bytes)) => RemoteInput::Bytes(bytes),
            (None, None) => RemoteInput::Bytes(&[]),
        };

        match self.remote.transform(input, treatment).await {
            Ok(image) => {
                log::info!(
                    "{source}: {treatment} via {} ({}x{})",
                    self.remote.name(),
                    image.dimensions.width,
                    image.dimensions.height
                );
                return Ok(ProcessedImage {
                    source: source.identity(),
                    treatment,
                    tier: Tier::Remote,
                    image,
                    analysis: None,
                });
            }
            Err(RemoteError::NotConfigured) => {}
            Err(RemoteError::Unsupported(_)) => log::debug!(
                "{source}: remote tier {} does not handle {treatment}",
                self.remote.name()
            ),
            Err(e) => log::warn!(
                "{source}: remote tier {} failed, using local pipeline: {e}",
                self.remote.name()
            ),
        }

        let bytes = match prefetched {
            Some(bytes) => bytes,
            None => self.fetcher.fetch(source).await?,
        };

        let config = Arc::clone(&self.config);
        let observer = Arc::clone(&self.observer);
        let output = tokio::task::spawn_blocking(move || {
            pristine_pipeline::process(&bytes, treatment, &config.pipeline, observer.as_ref())
        })
        .await??;

        log::info!(
            "{source}: {treatment} via local pipeline ({}x{}, {} recolored, {} cleared)",
            output.image.dimensions.width,
            output.image.dimensions.height,
            output.analysis.recolored,
            output.analysis.cleared
        );
        Ok(ProcessedImage {
            source: source.identity(),
            treatment,
            tier: Tier::Local,
            image: output.image,
            analysis: Some(output.analysis),
        })
    }
}

/// Membership in a key's in-flight set. Leaving (including by the
/// render future being dropped) forgets the slot once no member is left.
struct InFlight<'a> {
    map: &'a Mutex<HashMap<CacheKey, Slot>>,
    key: CacheKey,
    gate: Gate,
}

impl<'a> InFlight<'a> {
    fn enter(map: &'a Mutex<HashMap<CacheKey, Slot>>, key: &CacheKey) -> Self {
        let mut map_guard = map.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = map_guard.entry(key.clone()).or_default();
        slot.members += 1;
        let gate = Arc::clone(&slot.gate);
        drop(map_guard);
        Self {
            map,
            key: key.clone(),
            gate,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Membership only changes under the map lock.
        if let Some(slot) = map.get_mut(&self.key) {
            slot.members = slot.members.saturating_sub(1);
            if slot.members == 0 {
                map.remove(&self.key);
            }
        }
    }
}
