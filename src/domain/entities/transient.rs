//! Transient download files.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{trace, warn};

/// A short-lived local file holding raw downloaded bytes.
///
/// The holder owns the file for the duration of one conversion and must call
/// [`discard`](Self::discard) when done, whether the conversion succeeded or
/// not. Deletion failures are logged and never propagated; files that slip
/// through (for example after a crash) are reclaimed by
/// [`sweep_orphans`](crate::infrastructure::CacheStore::sweep_orphans).
#[derive(Debug)]
pub struct TransientDownload {
    path: PathBuf,
}

impl TransientDownload {
    /// Wraps an already-written transient file.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file holding the downloaded bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the backing file.
    pub async fn discard(self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => trace!(path = %self.path.display(), "Removed transient download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove transient download");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discard_removes_the_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl-test.part");
        fs::write(&path, b"bytes").await.unwrap();

        let transient = TransientDownload::new(path.clone());
        transient.discard().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discarding_a_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let transient = TransientDownload::new(dir.path().join("never-written.part"));
        transient.discard().await;
    }
}
