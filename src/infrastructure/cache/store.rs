//! Disk-backed, count-bounded store for optimized images.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{CacheKey, CacheRegistry, RegistryEntry};
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::RegistryStore;

use super::registry_store::JsonRegistryStore;

/// Maximum number of cached images kept by default.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Extension of finalized cache files.
pub const CACHE_FILE_EXT: &str = "jpg";

/// Extension of in-flight transient files (downloads and encoder output).
pub const TRANSIENT_FILE_EXT: &str = "part";

/// Statistics about the cache contents.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of registry entries.
    pub entries: usize,
    /// Total size of the backing files that still exist on disk.
    pub total_bytes: u64,
    /// Lookups served from the cache since startup.
    pub hits: u64,
    /// Lookups that found nothing usable since startup.
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} bytes), {} hits / {} misses",
            self.entries, self.total_bytes, self.hits, self.misses
        )
    }
}

/// Count-bounded disk cache pairing a directory of JPEG files with a
/// persisted URL registry.
///
/// Finalized files are named `{cache key}.jpg`; everything still in flight
/// carries the `.part` extension. The registry is the source of truth: a file
/// without an entry is garbage, an entry without a file is stale and gets
/// purged on the next lookup.
pub struct CacheStore {
    cache_dir: PathBuf,
    max_entries: usize,
    registry: RwLock<CacheRegistry>,
    store: Arc<dyn RegistryStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Creates a store over `cache_dir` with an explicit registry backend.
    ///
    /// The store is inert until [`init`](Self::init) runs.
    #[must_use]
    pub fn new(cache_dir: PathBuf, max_entries: usize, store: Arc<dyn RegistryStore>) -> Self {
        Self {
            cache_dir,
            max_entries,
            registry: RwLock::new(CacheRegistry::new()),
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a store persisting its registry as JSON inside `cache_dir`.
    #[must_use]
    pub fn with_json_registry(cache_dir: PathBuf, max_entries: usize) -> Self {
        let store = Arc::new(JsonRegistryStore::new(&cache_dir));
        Self::new(cache_dir, max_entries, store)
    }

    /// Creates the cache directory and loads the persisted registry.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or the registry
    /// cannot be read.
    pub async fn init(&self) -> OptimizeResult<()> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| OptimizeError::persistence(format!("Failed to create cache dir: {e}")))?;
        let loaded = self.store.load().await?;
        info!(
            path = %self.cache_dir.display(),
            entries = loaded.len(),
            "Cache store initialized"
        );
        *self.registry.write().await = loaded;
        Ok(())
    }

    /// The directory holding cached and transient files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The configured entry bound.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns the path of the file backing `key`.
    fn backing_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.{CACHE_FILE_EXT}", key.as_str()))
    }

    /// Looks up the cached file for `url`.
    ///
    /// Returns the path only when both the registry entry and its backing
    /// file exist. A stale entry whose file vanished is purged on the spot.
    pub async fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = {
            let registry = self.registry.read().await;
            registry.get(url).map(|entry| self.backing_path(&entry.cache_key))
        };
        let Some(path) = path else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Cache miss");
            return None;
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, path = %path.display(), "Cache hit");
            Some(path)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            warn!(url = %url, path = %path.display(), "Cache entry lost its backing file, purging");
            let mut registry = self.registry.write().await;
            registry.remove(url);
            self.persist(&registry).await;
            None
        }
    }

    /// Moves `transcoded` into the cache under a fresh key and records it
    /// for `url`, evicting the oldest entries once over the bound.
    ///
    /// Returns the finalized path. Registry persistence failures are logged
    /// and do not fail the put; only the file move itself can.
    ///
    /// # Errors
    /// Returns error if the transcoded file cannot be moved into place.
    pub async fn put(&self, url: &str, transcoded: &Path) -> OptimizeResult<PathBuf> {
        let key = CacheKey::derive(url);
        let final_path = self.backing_path(&key);
        fs::rename(transcoded, &final_path).await.map_err(|e| {
            OptimizeError::persistence(format!("Failed to move transcoded file into cache: {e}"))
        })?;

        let mut registry = self.registry.write().await;
        let displaced = registry.insert(url.to_string(), RegistryEntry::new(key.clone()));
        if let Some(old) = displaced {
            // The old file stays on disk unreferenced until a sweep reclaims it.
            trace!(url = %url, old_key = %old.cache_key, "Displaced previous cache entry");
        }
        self.persist(&registry).await;

        let evicted = self.evict_over_bound(&mut registry).await;
        if evicted > 0 {
            self.persist(&registry).await;
        }
        drop(registry);

        debug!(url = %url, key = %key, path = %final_path.display(), "Stored optimized image");
        Ok(final_path)
    }

    /// Deletes every cached file and empties the registry.
    ///
    /// # Errors
    /// Returns error if the emptied registry cannot be persisted.
    pub async fn clear(&self) -> OptimizeResult<()> {
        let mut registry = self.registry.write().await;
        for (url, entry) in registry.take_entries() {
            let path = self.backing_path(&entry.cache_key);
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(url = %url, path = %path.display(), error = %e, "Failed to remove cache file");
                }
            }
        }
        self.store.save(&registry).await?;
        info!("Cache cleared");
        Ok(())
    }

    /// Returns entry count, on-disk byte total, and lookup counters.
    pub async fn stats(&self) -> CacheStats {
        let registry = self.registry.read().await;
        let mut total_bytes = 0u64;
        for (_, entry) in registry.iter() {
            if let Ok(meta) = fs::metadata(self.backing_path(&entry.cache_key)).await {
                total_bytes += meta.len();
            }
        }
        CacheStats {
            entries: registry.len(),
            total_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Deletes cache files no registry entry references, plus any leftover
    /// transient files. Returns how many files were removed.
    ///
    /// Transient files belonging to in-flight conversions would be swept
    /// too, so this is meant for startup or explicit maintenance, not for
    /// running alongside live resolutions.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn sweep_orphans(&self) -> OptimizeResult<usize> {
        let registry = self.registry.read().await;
        let referenced: HashSet<PathBuf> =
            registry.cache_keys().map(|key| self.backing_path(key)).collect();

        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| OptimizeError::persistence(format!("Failed to read cache dir: {e}")))?;
        let mut removed = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let orphaned_cache_file = path.extension().is_some_and(|ext| ext == CACHE_FILE_EXT)
                && !referenced.contains(&path);
            let leftover_transient = path.extension().is_some_and(|ext| ext == TRANSIENT_FILE_EXT);
            if !orphaned_cache_file && !leftover_transient {
                continue;
            }
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove orphaned file");
            } else {
                debug!(path = %path.display(), "Removed orphaned file");
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "Swept orphaned cache files");
        }
        Ok(removed)
    }

    /// Persists the registry, logging instead of propagating failures.
    async fn persist(&self, registry: &CacheRegistry) {
        if let Err(e) = self.store.save(registry).await {
            warn!(error = %e, "Failed to persist cache registry");
        }
    }

    /// Evicts oldest-first until the registry fits the bound. Returns how
    /// many entries were evicted.
    async fn evict_over_bound(&self, registry: &mut CacheRegistry) -> usize {
        let mut evicted = 0usize;
        while registry.len() > self.max_entries {
            let Some((url, entry)) = registry.pop_oldest() else {
                break;
            };
            let path = self.backing_path(&entry.cache_key);
            match fs::remove_file(&path).await {
                Ok(()) => debug!(url = %url, path = %path.display(), "Evicted cache entry"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(url = %url, path = %path.display(), error = %e, "Failed to remove evicted file");
                }
            }
            evicted += 1;
        }
        evicted
    }
}
