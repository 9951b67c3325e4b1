//! JPEG transcoding of downloaded source images.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::DEFAULT_QUALITY;
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::Transcoder;
use crate::infrastructure::cache::TRANSIENT_FILE_EXT;

/// Prefix of transient files written by the transcoder.
const ENCODE_PREFIX: &str = "enc-";

/// Transcoder re-encoding source images as width-bounded JPEGs.
///
/// Decoding and encoding run on the blocking pool; alpha channels are
/// flattened since JPEG cannot carry them.
pub struct ImageTranscoder {
    cache_dir: PathBuf,
}

impl ImageTranscoder {
    /// Creates a transcoder writing its output files into `cache_dir`.
    #[must_use]
    pub const fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        quality: f32,
        max_width: u32,
    ) -> OptimizeResult<PathBuf> {
        let bytes = fs::read(input)
            .await
            .map_err(|e| OptimizeError::transcode(format!("Failed to read source file: {e}")))?;

        let quality = encode_quality(quality);
        let encoded = tokio::task::spawn_blocking(move || encode_jpeg(&bytes, quality, max_width))
            .await
            .map_err(|e| OptimizeError::transcode(format!("Encode task panicked: {e}")))??;

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| OptimizeError::transcode(format!("Failed to create cache dir: {e}")))?;
        let output = self
            .cache_dir
            .join(format!("{ENCODE_PREFIX}{}.{TRANSIENT_FILE_EXT}", Uuid::new_v4()));
        fs::write(&output, &encoded)
            .await
            .map_err(|e| OptimizeError::transcode(format!("Failed to write encoded file: {e}")))?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            quality,
            max_width,
            size = encoded.len(),
            "Transcoded image"
        );
        Ok(output)
    }
}

/// Maps a `(0, 1]` quality to the encoder's `1..=100` scale.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_quality(quality: f32) -> u8 {
    let quality = if quality.is_finite() && quality > 0.0 {
        quality.min(1.0)
    } else {
        DEFAULT_QUALITY
    };
    ((quality * 100.0).round() as u8).clamp(1, 100)
}

fn encode_jpeg(bytes: &[u8], quality: u8, max_width: u32) -> OptimizeResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| OptimizeError::transcode(format!("Failed to decode image: {e}")))?;

    let max_width = max_width.max(1);
    let img = if img.width() > max_width {
        // height bound is slack, the width governs the scale
        img.resize(max_width, u32::MAX, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.into_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| OptimizeError::transcode(format!("Failed to encode JPEG: {e}")))?;
    Ok(out)
}
