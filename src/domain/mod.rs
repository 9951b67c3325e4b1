//! Domain layer with core business entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, CacheRegistry, OptimizeOptions, ResolvedImage};
pub use errors::{OptimizeError, OptimizeResult};
pub use ports::{RegistryStore, RemoteFetcher, Transcoder};
