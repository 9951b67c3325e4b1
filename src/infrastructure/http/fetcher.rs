//! HTTP download of source images to transient files.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::{TransientDownload, is_remote_url};
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::RemoteFetcher;

use crate::infrastructure::cache::TRANSIENT_FILE_EXT;

/// Default timeout applied to one download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of transient files written by the fetcher.
const DOWNLOAD_PREFIX: &str = "dl-";

/// Fetcher downloading source images over HTTP into the cache directory.
pub struct HttpRemoteFetcher {
    http_client: reqwest::Client,
    cache_dir: PathBuf,
}

impl HttpRemoteFetcher {
    /// Creates a fetcher writing its transient files into `cache_dir`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(cache_dir: PathBuf, timeout: Duration) -> OptimizeResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("imgstash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OptimizeError::download(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            cache_dir,
        })
    }
}

#[async_trait]
impl RemoteFetcher for HttpRemoteFetcher {
    async fn download(&self, url: &str) -> OptimizeResult<TransientDownload> {
        if !is_remote_url(url) {
            return Err(OptimizeError::download(format!(
                "Not an absolute http(s) URL: {url}"
            )));
        }

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                OptimizeError::download("request timed out")
            } else if e.is_connect() {
                OptimizeError::download("failed to connect to host")
            } else {
                OptimizeError::download(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OptimizeError::download(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OptimizeError::download(format!("Failed to read body: {e}")))?;

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| OptimizeError::download(format!("Failed to create cache dir: {e}")))?;
        let path = self
            .cache_dir
            .join(format!("{DOWNLOAD_PREFIX}{}.{TRANSIENT_FILE_EXT}", Uuid::new_v4()));
        fs::write(&path, &bytes)
            .await
            .map_err(|e| OptimizeError::download(format!("Failed to write transient file: {e}")))?;

        debug!(url = %url, path = %path.display(), size = bytes.len(), "Downloaded source image");
        Ok(TransientDownload::new(path))
    }
}
