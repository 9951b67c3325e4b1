//! Resolution results and observable binding state.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// Returns true when `reference` is an absolute http(s) URL.
///
/// Anything else (bundled assets, file paths, empty strings) is a local
/// reference and passes through the optimizer untouched.
#[must_use]
pub fn is_remote_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// A displayable image reference produced by the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    /// Served from an existing cache entry.
    Cached(PathBuf),
    /// Downloaded and transcoded during this call.
    Optimized(PathBuf),
    /// The pipeline failed; the original remote URL is served instead.
    Fallback(String),
    /// Input was not a remote URL or conversion was disabled.
    Passthrough(String),
}

impl ResolvedImage {
    /// Returns the reference as a renderable string.
    #[must_use]
    pub fn reference(&self) -> Cow<'_, str> {
        match self {
            Self::Cached(path) | Self::Optimized(path) => path.to_string_lossy(),
            Self::Fallback(url) | Self::Passthrough(url) => Cow::Borrowed(url.as_str()),
        }
    }

    /// Returns the local file path, if this resolution produced one.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Cached(path) | Self::Optimized(path) => Some(path),
            Self::Fallback(_) | Self::Passthrough(_) => None,
        }
    }

    /// True when the resolution points at a local file.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Cached(_) | Self::Optimized(_))
    }

    /// True when the resolution was served from the cache.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// True when the original URL was served after a pipeline failure.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// True when the input was handed back without conversion.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }
}

impl fmt::Display for ResolvedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference())
    }
}

/// Lifecycle phase of one reactive binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// No URL bound, or the binding was reset.
    #[default]
    Idle,
    /// A resolution (or retry) is in flight.
    Loading,
    /// A displayable reference is available.
    Ready,
    /// Resolution failed and fallback was disabled.
    Failed,
}

impl LoadPhase {
    /// True when no work is bound.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// True while a resolution is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True when a displayable reference is available.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// True when resolution gave up.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Snapshot published by an [`OptimizedImage`](crate::application::OptimizedImage) binding.
///
/// When a fallback masks a pipeline failure the snapshot reads as `Ready`
/// with the original URL and no error; only `retry_count` records that the
/// conversion was attempted and lost.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageState {
    /// Current lifecycle phase.
    pub phase: LoadPhase,
    /// The reference to render, when one is available.
    pub resolved: Option<String>,
    /// Terminal error message, only set in the `Failed` phase.
    pub error: Option<String>,
    /// Retries consumed by the most recent resolution.
    pub retry_count: u32,
}

impl ImageState {
    /// The reset state: nothing bound, nothing resolved.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// A resolution is in flight after `retry_count` failed attempts.
    #[must_use]
    pub fn loading(retry_count: u32) -> Self {
        Self {
            phase: LoadPhase::Loading,
            resolved: None,
            error: None,
            retry_count,
        }
    }

    /// A displayable reference is available.
    #[must_use]
    pub fn ready(resolved: String, retry_count: u32) -> Self {
        Self {
            phase: LoadPhase::Ready,
            resolved: Some(resolved),
            error: None,
            retry_count,
        }
    }

    /// Resolution gave up with `error`.
    #[must_use]
    pub fn failed(error: String, retry_count: u32) -> Self {
        Self {
            phase: LoadPhase::Failed,
            resolved: None,
            error: Some(error),
            retry_count,
        }
    }

    /// True while a resolution is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// True when the binding carries a terminal error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
