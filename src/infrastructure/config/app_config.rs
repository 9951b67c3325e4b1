//! Application configuration.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::domain::entities::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, OptimizeOptions};
use crate::infrastructure::cache::DEFAULT_MAX_ENTRIES;

const APP_NAME: &str = "imgstash";
const APP_QUALIFIER: &str = "io";
const APP_ORGANIZATION: &str = "imgstash";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Conversion tuning applied when a call does not override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Re-encode quality in `(0, 1]`.
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// Upper bound on output width in pixels.
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            max_width: default_max_width(),
        }
    }
}

/// Application configuration from file and CLI.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache directory override.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of cached images.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Download timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Conversion tuning.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

fn default_quality() -> f32 {
    DEFAULT_QUALITY
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            cache_dir: None,
            max_entries: default_max_entries(),
            timeout_secs: default_timeout_secs(),
            conversion: ConversionConfig::default(),
        }
    }
}

use super::args::CliArgs;

impl AppConfig {
    /// Loads the configuration from `path`, or the default location when
    /// `path` is `None`. A missing or unparsable file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if an existing config file cannot be read.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path);
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .wrap_err("Failed to read config file")?;

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config file unreadable, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(max_entries) = args.max_entries {
            self.max_entries = max_entries;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns the default cache directory.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map_or_else(
            || std::env::temp_dir().join(APP_NAME).join("images"),
            |dirs| dirs.cache_dir().join("images"),
        )
    }

    /// Returns the cache directory to use.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(Self::default_cache_dir)
    }

    /// Returns per-call options seeded from the configured tuning.
    #[must_use]
    pub fn default_options(&self) -> OptimizeOptions {
        OptimizeOptions::new()
            .with_quality(self.conversion.quality)
            .with_max_width(self.conversion.max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_with_conversion_section() {
        let toml_content = r#"
            log_level = "debug"
            max_entries = 20

            [conversion]
            quality = 0.6
            max_width = 640
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.max_entries, 20);
        assert!((config.conversion.quality - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.conversion.max_width, 640);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_default_config_matches_cache_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
        assert!(config.cache_dir.is_none());
        let options = config.default_options();
        assert!((options.quality - DEFAULT_QUALITY).abs() < f32::EPSILON);
        assert_eq!(options.max_width, DEFAULT_MAX_WIDTH);
    }

    #[tokio::test]
    async fn test_load_falls_back_on_corrupt_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_entries = \"not a number\"")
            .await
            .unwrap();

        let config = AppConfig::load(Some(&path)).await.unwrap();

        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
    }
}
