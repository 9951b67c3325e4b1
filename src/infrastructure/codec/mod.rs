//! Image re-encoding infrastructure.

pub mod transcoder;

pub use transcoder::ImageTranscoder;
