//! Registry persistence port definition.

use async_trait::async_trait;

use crate::domain::entities::CacheRegistry;
use crate::domain::errors::OptimizeResult;

/// Port for persisting the cache registry across process restarts.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Loads the persisted registry, or an empty one when nothing was saved.
    async fn load(&self) -> OptimizeResult<CacheRegistry>;

    /// Persists `registry`, replacing the previous snapshot.
    async fn save(&self, registry: &CacheRegistry) -> OptimizeResult<()>;
}

#[cfg(test)]
pub mod mock {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::domain::errors::OptimizeError;

    /// In-memory registry store for testing.
    pub struct MemoryRegistryStore {
        inner: Mutex<CacheRegistry>,
        saves: AtomicUsize,
        fail_saves: AtomicBool,
    }

    impl MemoryRegistryStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::with_registry(CacheRegistry::new())
        }

        /// Creates a store pre-seeded with `registry`.
        pub fn with_registry(registry: CacheRegistry) -> Self {
            Self {
                inner: Mutex::new(registry),
                saves: AtomicUsize::new(0),
                fail_saves: AtomicBool::new(false),
            }
        }

        /// Makes every save fail.
        pub fn fail_saves(&self) {
            self.fail_saves.store(true, Ordering::SeqCst);
        }

        /// Number of successful saves so far.
        pub fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        /// The most recently saved registry.
        pub fn snapshot(&self) -> CacheRegistry {
            self.inner.lock().clone()
        }
    }

    impl Default for MemoryRegistryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl RegistryStore for MemoryRegistryStore {
        async fn load(&self) -> OptimizeResult<CacheRegistry> {
            Ok(self.inner.lock().clone())
        }

        async fn save(&self, registry: &CacheRegistry) -> OptimizeResult<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(OptimizeError::persistence("mock save failure"));
            }
            *self.inner.lock() = registry.clone();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
