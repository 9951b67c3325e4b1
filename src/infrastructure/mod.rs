//! Infrastructure layer with external service adapters.

/// Cache persistence (disk store, registry snapshots).
pub mod cache;
/// Image re-encoding.
pub mod codec;
/// Application configuration.
pub mod config;
/// HTTP source fetching.
pub mod http;

pub use cache::{CacheStats, CacheStore, DEFAULT_MAX_ENTRIES, JsonRegistryStore};
pub use codec::ImageTranscoder;
pub use config::{AppConfig, CliArgs, Command, LogLevel};
pub use http::{DEFAULT_DOWNLOAD_TIMEOUT, HttpRemoteFetcher};
