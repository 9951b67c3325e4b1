use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "imgstash",
    version,
    about = "On-device image optimization cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache directory.
    #[arg(long, value_name = "DIR", env = "IMGSTASH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of cached images.
    #[arg(long)]
    pub max_entries: Option<usize>,

    /// Download timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Cache operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Cache operations exposed on the command line.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a URL to an optimized local file.
    Resolve {
        /// Source image URL.
        url: String,

        /// Re-encode quality in (0, 1].
        #[arg(long)]
        quality: Option<f32>,

        /// Upper bound on output width in pixels.
        #[arg(long)]
        max_width: Option<u32>,

        /// Skip the cache lookup and convert again.
        #[arg(long)]
        force_refresh: bool,

        /// Fail instead of serving the original URL on errors.
        #[arg(long)]
        no_fallback: bool,
    },

    /// Pre-convert a list of URLs into the cache.
    Warm {
        /// Source image URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Re-encode quality in (0, 1].
        #[arg(long)]
        quality: Option<f32>,

        /// Upper bound on output width in pixels.
        #[arg(long)]
        max_width: Option<u32>,
    },

    /// Print cache statistics.
    Stats,

    /// Delete unreferenced cache files and leftover transients.
    Sweep,

    /// Delete every cached image.
    Clear,
}
