//! HTTP transport infrastructure.

pub mod fetcher;

pub use fetcher::{DEFAULT_DOWNLOAD_TIMEOUT, HttpRemoteFetcher};
