//! Cache persistence infrastructure.
//!
//! This module provides:
//! - A count-bounded disk store for optimized images
//! - JSON persistence for the URL registry

pub mod registry_store;
pub mod store;

pub use registry_store::JsonRegistryStore;
pub use store::{CACHE_FILE_EXT, CacheStats, CacheStore, DEFAULT_MAX_ENTRIES, TRANSIENT_FILE_EXT};
