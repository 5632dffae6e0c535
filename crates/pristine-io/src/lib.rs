//! pristine-io: fetching, caching, and fallback orchestration around the
//! sans-IO `pristine-pipeline`.
//!
//! [`Normalizer`] is the entry point. It loads a source (URL, file, or
//! inline bytes), tries the remote transformation service, falls back to
//! the local pixel pipeline on a blocking thread, and finally to the
//! original reference. Successful results are memoized in an injectable
//! [`ResultCache`].

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalizer;
pub mod remote;
pub mod rendition;
pub mod source;

pub use cache::{CacheKey, LruResultCache, MemoryCache, ResultCache};
pub use config::{FetchConfig, NormalizerConfig, RemoteConfig};
pub use error::{FetchError, NormalizeError, RemoteError};
pub use fetch::{Fetch, HttpFetcher};
pub use normalizer::{LogObserver, Normalizer};
pub use remote::{AnyRemote, NoRemote, RemoteInput, RemoteTransform, RemoveBgClient};
pub use rendition::{ProcessedImage, Rendition, Tier};
pub use source::{DisplayHint, ImageSource};
