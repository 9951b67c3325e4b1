//! Remote fetcher port definition.

use async_trait::async_trait;

use crate::domain::entities::TransientDownload;
use crate::domain::errors::OptimizeResult;

/// Port for downloading source images to transient local files.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Downloads `url` into a uniquely named transient file.
    ///
    /// The caller owns the returned file and must discard it once the
    /// conversion finishes.
    async fn download(&self, url: &str) -> OptimizeResult<TransientDownload>;
}

#[cfg(test)]
pub mod mock {
    use super::*;

    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::fs;

    use crate::domain::errors::OptimizeError;

    /// Mock fetcher writing a fixed payload instead of hitting the network.
    pub struct MockRemoteFetcher {
        dir: PathBuf,
        payload: Vec<u8>,
        calls: AtomicUsize,
        fail_remaining: AtomicUsize,
        fail_always: AtomicBool,
        delays: Mutex<HashMap<String, Duration>>,
    }

    impl MockRemoteFetcher {
        /// Creates a mock that writes its transient files into `dir`.
        pub fn new(dir: PathBuf) -> Self {
            Self {
                dir,
                payload: b"mock image bytes".to_vec(),
                calls: AtomicUsize::new(0),
                fail_remaining: AtomicUsize::new(0),
                fail_always: AtomicBool::new(false),
                delays: Mutex::new(HashMap::new()),
            }
        }

        /// Replaces the payload written on successful downloads.
        #[must_use]
        pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
            self.payload = payload;
            self
        }

        /// Makes the next `count` downloads fail.
        pub fn fail_next(&self, count: usize) {
            self.fail_remaining.store(count, Ordering::SeqCst);
        }

        /// Makes every download fail.
        pub fn fail_always(&self) {
            self.fail_always.store(true, Ordering::SeqCst);
        }

        /// Delays downloads of `url` by `delay`.
        pub fn set_delay(&self, url: &str, delay: Duration) {
            self.delays.lock().insert(url.to_string(), delay);
        }

        /// Number of download calls so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteFetcher for MockRemoteFetcher {
        async fn download(&self, url: &str) -> OptimizeResult<TransientDownload> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = self.delays.lock().get(url).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_always.load(Ordering::SeqCst) {
                return Err(OptimizeError::download("mock transport failure"));
            }
            let remaining = self.fail_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(OptimizeError::download("mock transport failure"));
            }
            let path = self.dir.join(format!("dl-mock-{call}.part"));
            fs::write(&path, &self.payload)
                .await
                .map_err(|e| OptimizeError::download(format!("mock write failed: {e}")))?;
            Ok(TransientDownload::new(path))
        }
    }
}
