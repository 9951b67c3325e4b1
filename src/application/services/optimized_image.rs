//! Reactive binding between the optimizer and presentation code.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::domain::entities::{ImageState, OptimizeOptions};
use crate::domain::errors::OptimizeError;

use super::image_optimizer::ImageOptimizer;

/// Fixed pause between retry attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Binds one image slot to the optimizer and publishes state snapshots.
///
/// Callers point the binding at a URL with [`set_url`](Self::set_url) and
/// watch the [`subscribe`](Self::subscribe)d channel. Every rebind bumps an
/// internal generation counter; a resolution finishing for an outdated
/// generation is discarded, so the last bound URL always wins no matter how
/// slowly earlier ones resolve.
///
/// Failed conversions are retried with a fixed backoff up to the options'
/// retry budget. When the budget is exhausted and fallback is enabled, the
/// binding settles on `Ready` with the original URL and no error; only
/// `retry_count` betrays the lost conversion.
pub struct OptimizedImage {
    optimizer: Arc<ImageOptimizer>,
    options: OptimizeOptions,
    backoff: Duration,
    state_tx: watch::Sender<ImageState>,
    generation: Arc<AtomicU64>,
    current_url: Mutex<Option<String>>,
}

impl OptimizedImage {
    /// Creates an idle binding.
    #[must_use]
    pub fn new(optimizer: Arc<ImageOptimizer>, options: OptimizeOptions) -> Self {
        let (state_tx, _) = watch::channel(ImageState::idle());
        Self {
            optimizer,
            options: options.normalized(),
            backoff: DEFAULT_RETRY_BACKOFF,
            state_tx,
            generation: Arc::new(AtomicU64::new(0)),
            current_url: Mutex::new(None),
        }
    }

    /// Overrides the retry backoff.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Subscribes to state snapshots. The receiver always observes the
    /// latest state first.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ImageState> {
        self.state_tx.subscribe()
    }

    /// Returns the current state snapshot.
    #[must_use]
    pub fn state(&self) -> ImageState {
        self.state_tx.borrow().clone()
    }

    /// Points the binding at `url`, superseding any resolution in flight.
    ///
    /// `None` and the empty string reset the binding to idle.
    pub fn set_url(&self, url: Option<&str>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        match url {
            None | Some("") => {
                *self.current_url.lock() = None;
                self.state_tx.send_replace(ImageState::idle());
                trace!("Binding reset to idle");
            }
            Some(url) => {
                *self.current_url.lock() = Some(url.to_string());
                self.spawn_resolution(url.to_string(), generation, false);
            }
        }
    }

    /// Re-resolves the current URL, bypassing the cache.
    ///
    /// Does nothing while no URL is bound.
    pub fn refresh(&self) {
        let Some(url) = self.current_url.lock().clone() else {
            return;
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.spawn_resolution(url, generation, true);
    }

    fn spawn_resolution(&self, url: String, generation: u64, force: bool) {
        self.state_tx.send_replace(ImageState::loading(0));
        let optimizer = Arc::clone(&self.optimizer);
        let options = self.options.clone();
        let backoff = self.backoff;
        let state_tx = self.state_tx.clone();
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            resolve_with_retries(
                &optimizer, &options, backoff, &url, generation, force, &state_tx, &current,
            )
            .await;
        });
    }
}

impl Drop for OptimizedImage {
    fn drop(&mut self) {
        // orphan any resolution still in flight
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[allow(clippy::too_many_arguments)]
async fn resolve_with_retries(
    optimizer: &ImageOptimizer,
    options: &OptimizeOptions,
    backoff: Duration,
    url: &str,
    generation: u64,
    force: bool,
    state_tx: &watch::Sender<ImageState>,
    current: &AtomicU64,
) {
    let mut retry_count = 0u32;
    let last_error: OptimizeError;
    loop {
        // retries always reconvert; fallback is applied once retries are spent
        let attempt = options
            .clone()
            .with_force_refresh(force || options.force_refresh || retry_count > 0)
            .without_fallback();
        match optimizer.get_optimized_image(url, &attempt).await {
            Ok(resolved) => {
                publish_if_current(
                    state_tx,
                    current,
                    generation,
                    ImageState::ready(resolved.reference().into_owned(), retry_count),
                );
                return;
            }
            Err(e) if options.retry_on_error && retry_count < options.max_retries => {
                retry_count += 1;
                debug!(url = %url, attempt = retry_count, error = %e, "Retrying image optimization");
                publish_if_current(state_tx, current, generation, ImageState::loading(retry_count));
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                last_error = e;
                break;
            }
        }
    }

    if options.fallback_to_original {
        debug!(url = %url, retries = retry_count, "Serving original URL after failed optimization");
        publish_if_current(
            state_tx,
            current,
            generation,
            ImageState::ready(url.to_string(), retry_count),
        );
    } else {
        warn!(url = %url, retries = retry_count, error = %last_error, "Image optimization gave up");
        publish_if_current(
            state_tx,
            current,
            generation,
            ImageState::failed(last_error.to_string(), retry_count),
        );
    }
}

/// Publishes `state` unless a newer generation superseded this resolution.
fn publish_if_current(
    state_tx: &watch::Sender<ImageState>,
    current: &AtomicU64,
    generation: u64,
    state: ImageState,
) {
    let published = state_tx.send_if_modified(|slot| {
        if current.load(Ordering::SeqCst) == generation {
            *slot = state;
            true
        } else {
            false
        }
    });
    if !published {
        trace!(generation, "Discarded stale resolution result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LoadPhase;
    use crate::domain::ports::mocks::{MemoryRegistryStore, MockRemoteFetcher, MockTranscoder};
    use crate::infrastructure::cache::CacheStore;
    use tempfile::TempDir;

    struct Fixture {
        binding: OptimizedImage,
        fetcher: Arc<MockRemoteFetcher>,
        _temp: TempDir,
    }

    async fn fixture(options: OptimizeOptions) -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(CacheStore::new(
            temp.path().to_path_buf(),
            10,
            Arc::new(MemoryRegistryStore::new()),
        ));
        store.init().await.unwrap();
        let fetcher = Arc::new(MockRemoteFetcher::new(temp.path().to_path_buf()));
        let transcoder = Arc::new(MockTranscoder::new(temp.path().to_path_buf()));
        let optimizer = Arc::new(ImageOptimizer::with_ports(
            store,
            fetcher.clone(),
            transcoder,
        ));
        let binding = OptimizedImage::new(optimizer, options)
            .with_backoff(Duration::from_millis(20));
        Fixture {
            binding,
            fetcher,
            _temp: temp,
        }
    }

    /// Waits until the published state leaves the loading/idle phases.
    async fn settled(binding: &OptimizedImage) -> ImageState {
        let mut rx = binding.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if state.phase.is_ready() || state.phase.is_failed() {
                    return state.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let fx = fixture(OptimizeOptions::default()).await;
        let state = fx.binding.state();
        assert!(state.phase.is_idle());
        assert!(state.resolved.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_to_a_local_file() {
        let fx = fixture(OptimizeOptions::default()).await;

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        assert!(fx.binding.state().is_loading());
        let state = settled(&fx.binding).await;

        assert_eq!(state.phase, LoadPhase::Ready);
        assert!(state.resolved.as_deref().unwrap().ends_with(".jpg"));
        assert!(!state.has_error());
        assert_eq!(state.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_masks_the_failure_with_the_original_url() {
        let fx = fixture(OptimizeOptions::new().with_max_retries(2)).await;
        fx.fetcher.fail_always();

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        let state = settled(&fx.binding).await;

        // initial attempt plus two retries, then the fallback masks the error
        assert_eq!(fx.fetcher.calls(), 3);
        assert_eq!(state.phase, LoadPhase::Ready);
        assert_eq!(state.resolved.as_deref(), Some("https://cdn.example.com/a.png"));
        assert!(!state.has_error());
        assert_eq!(state.retry_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_when_a_retry_succeeds() {
        let fx = fixture(OptimizeOptions::default()).await;
        fx.fetcher.fail_next(1);

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        let state = settled(&fx.binding).await;

        assert_eq!(fx.fetcher.calls(), 2);
        assert_eq!(state.phase, LoadPhase::Ready);
        assert!(state.resolved.as_deref().unwrap().ends_with(".jpg"));
        assert_eq!(state.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_terminally_without_fallback() {
        let fx = fixture(
            OptimizeOptions::new().without_fallback().with_max_retries(2),
        )
        .await;
        fx.fetcher.fail_always();

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        let state = settled(&fx.binding).await;

        assert_eq!(state.phase, LoadPhase::Failed);
        assert!(state.has_error());
        assert!(state.resolved.is_none());
        assert_eq!(state.retry_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_when_disabled() {
        let fx = fixture(OptimizeOptions::new().without_retry()).await;
        fx.fetcher.fail_always();

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        let state = settled(&fx.binding).await;

        assert_eq!(fx.fetcher.calls(), 1);
        assert_eq!(state.phase, LoadPhase::Ready);
        assert_eq!(state.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_bound_url_wins() {
        let fx = fixture(OptimizeOptions::default()).await;
        fx.fetcher
            .set_delay("https://cdn.example.com/slow.png", Duration::from_secs(1));

        fx.binding.set_url(Some("https://cdn.example.com/slow.png"));
        fx.binding.set_url(Some("https://cdn.example.com/fast.png"));
        let state = settled(&fx.binding).await;
        assert!(state.resolved.as_deref().unwrap().ends_with(".jpg"));

        // let the superseded resolution finish and get discarded
        tokio::time::sleep(Duration::from_secs(2)).await;
        let after = fx.binding.state();
        assert_eq!(after, state);
        assert_eq!(fx.fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reconverts_the_current_url() {
        let fx = fixture(OptimizeOptions::default()).await;

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        settled(&fx.binding).await;
        assert_eq!(fx.fetcher.calls(), 1);

        fx.binding.refresh();
        let state = settled(&fx.binding).await;

        assert_eq!(fx.fetcher.calls(), 2);
        assert_eq!(state.phase, LoadPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinding_resets_the_retry_count() {
        let fx = fixture(OptimizeOptions::new().with_max_retries(1)).await;
        fx.fetcher.fail_next(2);

        fx.binding.set_url(Some("https://cdn.example.com/a.png"));
        let first = settled(&fx.binding).await;
        assert_eq!(first.retry_count, 1);

        fx.binding.set_url(Some("https://cdn.example.com/b.png"));
        let second = settled(&fx.binding).await;
        assert_eq!(second.retry_count, 0);
        assert!(second.resolved.as_deref().unwrap().ends_with(".jpg"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_the_url_resets_to_idle() {
        let fx = fixture(OptimizeOptions::default()).await;
        fx.fetcher
            .set_delay("https://cdn.example.com/slow.png", Duration::from_secs(1));

        fx.binding.set_url(Some("https://cdn.example.com/slow.png"));
        fx.binding.set_url(None);

        assert!(fx.binding.state().phase.is_idle());
        // the in-flight resolution must not resurrect the binding
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fx.binding.state().phase.is_idle());
    }
}
