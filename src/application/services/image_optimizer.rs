//! Image optimization orchestration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::domain::entities::{OptimizeOptions, ResolvedImage, is_remote_url};
use crate::domain::errors::OptimizeResult;
use crate::domain::ports::{RemoteFetcher, Transcoder};
use crate::infrastructure::cache::{CacheStore, DEFAULT_MAX_ENTRIES};
use crate::infrastructure::codec::ImageTranscoder;
use crate::infrastructure::http::{DEFAULT_DOWNLOAD_TIMEOUT, HttpRemoteFetcher};

/// Settings for building a process-wide [`ImageOptimizer`].
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Directory holding cached and transient files.
    pub cache_dir: PathBuf,
    /// Maximum number of cached images.
    pub max_entries: usize,
    /// Timeout applied to one download.
    pub download_timeout: Duration,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("imgstash").join("images"),
            max_entries: DEFAULT_MAX_ENTRIES,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

/// Resolves image URLs to local optimized files, converting on demand.
///
/// One instance owns one cache directory. Each resolution makes a single
/// pipeline attempt; retries belong to
/// [`OptimizedImage`](crate::application::OptimizedImage) bindings.
#[derive(Clone)]
pub struct ImageOptimizer {
    store: Arc<CacheStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    transcoder: Arc<dyn Transcoder>,
}

impl ImageOptimizer {
    /// Builds the production wiring and initializes the cache store.
    ///
    /// # Errors
    /// Returns error if the cache directory or HTTP client cannot be set up.
    pub async fn new(config: OptimizerConfig) -> OptimizeResult<Self> {
        let store = Arc::new(CacheStore::with_json_registry(
            config.cache_dir.clone(),
            config.max_entries,
        ));
        store.init().await?;
        let fetcher = Arc::new(HttpRemoteFetcher::new(
            config.cache_dir.clone(),
            config.download_timeout,
        )?);
        let transcoder = Arc::new(ImageTranscoder::new(config.cache_dir));
        Ok(Self::with_ports(store, fetcher, transcoder))
    }

    /// Assembles an optimizer from explicit ports.
    ///
    /// The store must already be initialized.
    #[must_use]
    pub const fn with_ports(
        store: Arc<CacheStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            store,
            fetcher,
            transcoder,
        }
    }

    /// The underlying cache store, for stats and maintenance.
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Resolves `url` to a displayable reference.
    ///
    /// Non-remote references pass through untouched. Remote URLs are served
    /// from the cache when possible, otherwise downloaded, transcoded, and
    /// stored. When the pipeline fails and `fallback_to_original` is set,
    /// the original URL is returned instead of the error.
    ///
    /// # Errors
    /// Returns error if the pipeline fails and fallback is disabled.
    pub async fn get_optimized_image(
        &self,
        url: &str,
        options: &OptimizeOptions,
    ) -> OptimizeResult<ResolvedImage> {
        if !is_remote_url(url) {
            trace!(url = %url, "Non-remote reference passed through");
            return Ok(ResolvedImage::Passthrough(url.to_string()));
        }
        let options = options.normalized();
        if !options.auto_convert {
            debug!(url = %url, "Conversion disabled, passing URL through");
            return Ok(ResolvedImage::Passthrough(url.to_string()));
        }

        if !options.force_refresh && let Some(path) = self.store.lookup(url).await {
            debug!(url = %url, path = %path.display(), "Serving cached image");
            return Ok(ResolvedImage::Cached(path));
        }

        match self.convert_and_store(url, &options).await {
            Ok(resolved) => Ok(resolved),
            Err(e) if options.fallback_to_original => {
                warn!(url = %url, error = %e, "Optimization failed, serving original URL");
                Ok(ResolvedImage::Fallback(url.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Sequentially resolves `urls` to warm the cache. Returns how many
    /// ended up backed by a local file.
    pub async fn warm(&self, urls: &[String], options: &OptimizeOptions) -> usize {
        let mut local = 0usize;
        for url in urls {
            match self.get_optimized_image(url, options).await {
                Ok(resolved) if resolved.is_local() => local += 1,
                Ok(resolved) => {
                    trace!(url = %url, resolved = %resolved, "Warm call did not produce a local file");
                }
                Err(e) => warn!(url = %url, error = %e, "Failed to warm cache entry"),
            }
        }
        debug!(requested = urls.len(), local, "Cache warm finished");
        local
    }

    /// Runs download, transcode, and store for one URL.
    ///
    /// The transient download is discarded whether or not the transcode
    /// succeeds. A failed registry put degrades to serving the transcoded
    /// file without a cache entry.
    async fn convert_and_store(
        &self,
        url: &str,
        options: &OptimizeOptions,
    ) -> OptimizeResult<ResolvedImage> {
        let download = self.fetcher.download(url).await?;
        let transcoded = self
            .transcoder
            .transcode(download.path(), options.quality, options.max_width)
            .await;
        download.discard().await;
        let transcoded = transcoded?;

        match self.store.put(url, &transcoded).await {
            Ok(final_path) => Ok(ResolvedImage::Optimized(final_path)),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to record cache entry, serving unregistered file");
                Ok(ResolvedImage::Optimized(transcoded))
            }
        }
    }
}
