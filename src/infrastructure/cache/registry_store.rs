//! JSON file persistence for the cache registry.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::domain::entities::CacheRegistry;
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::RegistryStore;

/// File name of the registry snapshot inside the cache directory.
pub const REGISTRY_FILE_NAME: &str = "registry.json";

/// Registry store writing a single JSON snapshot next to the cached files.
pub struct JsonRegistryStore {
    path: PathBuf,
}

impl JsonRegistryStore {
    /// Creates a store persisting into `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(REGISTRY_FILE_NAME),
        }
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryStore for JsonRegistryStore {
    async fn load(&self) -> OptimizeResult<CacheRegistry> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CacheRegistry::new());
            }
            Err(e) => {
                return Err(OptimizeError::persistence(format!(
                    "Failed to read registry file: {e}"
                )));
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(registry) => Ok(registry),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Registry file unreadable, starting empty");
                Ok(CacheRegistry::new())
            }
        }
    }

    async fn save(&self, registry: &CacheRegistry) -> OptimizeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                OptimizeError::persistence(format!("Failed to create cache dir: {e}"))
            })?;
        }
        let json = serde_json::to_vec_pretty(registry)
            .map_err(|e| OptimizeError::persistence(format!("Failed to serialize registry: {e}")))?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| OptimizeError::persistence(format!("Failed to write registry file: {e}")))?;
        Ok(())
    }
}
