//! Transcoder port definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::OptimizeResult;

/// Port for re-encoding a downloaded image into the cache's target format.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encodes the image at `input` into a new transient file.
    ///
    /// `quality` is in `(0, 1]`; `max_width` bounds the output width without
    /// ever upscaling. The input file is left in place.
    async fn transcode(&self, input: &Path, quality: f32, max_width: u32)
    -> OptimizeResult<PathBuf>;
}
