//! Optimization pipeline error types.

use thiserror::Error;

/// Errors surfaced by the image optimization pipeline.
///
/// Non-remote input is not an error: the optimizer passes it through
/// untouched, so no variant exists for it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizeError {
    /// The source image could not be downloaded.
    #[error("download failed: {message}")]
    Download {
        /// What went wrong during the transfer.
        message: String,
    },

    /// The downloaded bytes could not be decoded or re-encoded.
    #[error("transcode failed: {message}")]
    Transcode {
        /// What went wrong during conversion.
        message: String,
    },

    /// The cache index or a cached file could not be written.
    #[error("cache persistence failed: {message}")]
    CachePersistence {
        /// What went wrong while persisting.
        message: String,
    },
}

impl OptimizeError {
    /// Creates a download error.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }

    /// Creates a transcode error.
    pub fn transcode(message: impl Into<String>) -> Self {
        Self::Transcode {
            message: message.into(),
        }
    }

    /// Creates a cache persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::CachePersistence {
            message: message.into(),
        }
    }

    /// True when a retry with the same input could plausibly succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Download { .. } | Self::Transcode { .. })
    }
}

/// Result alias for optimization pipeline operations.
pub type OptimizeResult<T> = Result<T, OptimizeError>;
