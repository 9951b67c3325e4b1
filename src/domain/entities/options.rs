//! Per-call conversion parameters.

/// Default re-encode quality in the `(0, 1]` range.
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Default upper bound on output width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// Default number of retries after a failed conversion.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Tuning knobs for a single optimization call.
///
/// Values are normalized before use: a quality outside `(0, 1]` falls back
/// to [`DEFAULT_QUALITY`] (above 1 is clamped down), and a zero width is
/// raised to 1.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OptimizeOptions {
    /// Re-encode quality in `(0, 1]`.
    pub quality: f32,
    /// Upper bound on output width in pixels. Images are never upscaled.
    pub max_width: u32,
    /// Skip the cache lookup and convert again.
    pub force_refresh: bool,
    /// When false, remote URLs are passed through without conversion.
    pub auto_convert: bool,
    /// Serve the original URL when the conversion pipeline fails.
    pub fallback_to_original: bool,
    /// Whether a reactive binding retries failed conversions.
    pub retry_on_error: bool,
    /// How many retries a reactive binding performs before giving up.
    pub max_retries: u32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_width: DEFAULT_MAX_WIDTH,
            force_refresh: false,
            auto_convert: true,
            fallback_to_original: true,
            retry_on_error: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl OptimizeOptions {
    /// Creates options with the default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the re-encode quality.
    #[must_use]
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the output width bound.
    #[must_use]
    pub const fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    /// Forces a cache bypass for this call.
    #[must_use]
    pub const fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// Disables conversion entirely; remote URLs pass through untouched.
    #[must_use]
    pub const fn without_auto_convert(mut self) -> Self {
        self.auto_convert = false;
        self
    }

    /// Propagates pipeline errors instead of serving the original URL.
    #[must_use]
    pub const fn without_fallback(mut self) -> Self {
        self.fallback_to_original = false;
        self
    }

    /// Disables retries in reactive bindings.
    #[must_use]
    pub const fn without_retry(mut self) -> Self {
        self.retry_on_error = false;
        self
    }

    /// Sets the retry budget for reactive bindings.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns a copy with out-of-range values pulled back into range.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut options = self.clone();
        if !options.quality.is_finite() || options.quality <= 0.0 {
            options.quality = DEFAULT_QUALITY;
        } else if options.quality > 1.0 {
            options.quality = 1.0;
        }
        options.max_width = options.max_width.max(1);
        options
    }
}
